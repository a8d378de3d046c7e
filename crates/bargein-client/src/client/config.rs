use super::consts;

#[derive(Debug, Clone)]
pub struct Config {
    base_url: String,
    channel: String,
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_channel(mut self, channel: &str) -> Self {
        self.config.channel = channel.to_string();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            base_url: consts::DEFAULT_BASE_URL.to_string(),
            channel: consts::DEFAULT_CHANNEL.to_string(),
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// The websocket endpoint serving this channel.
    pub fn endpoint(&self) -> String {
        format!("{}/ws/{}", self.base_url, self.channel)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_url_and_channel() {
        let config = Config::builder()
            .with_base_url("ws://localhost:9000/")
            .with_channel("kitchen")
            .build();
        assert_eq!(config.endpoint(), "ws://localhost:9000/ws/kitchen");
        assert_eq!(Config::new().endpoint(), "ws://127.0.0.1:8080/ws/default");
    }
}
