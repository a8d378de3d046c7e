use std::fmt;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

opaque_id!(
    /// Identifies one generated audio response. Unique per generation.
    ResponseId
);

opaque_id!(
    /// Identifies a conversation session on the server.
    SessionId
);

opaque_id!(
    /// The connection/room identifier a listener joins with.
    ChannelId
);

impl ResponseId {
    pub fn generate() -> Self {
        Self(format!("resp_{}", uuid::Uuid::new_v4().simple()))
    }
}

impl SessionId {
    pub fn generate() -> Self {
        Self(format!("sess_{}", uuid::Uuid::new_v4().simple()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_response_ids_are_distinct() {
        let a = ResponseId::generate();
        let b = ResponseId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("resp_"));
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = ResponseId::new("resp_1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"resp_1\"");
    }
}
