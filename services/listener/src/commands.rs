//! Parsing of the line-oriented commands typed on stdin.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Local voice activity started.
    Vad,
    /// A transcribed utterance with its confidence score.
    Result { confidence: f32, text: String },
    /// Send a recorded utterance for server-side transcription.
    Audio(PathBuf),
    /// Ask the server to speak some text.
    Say(String),
    Status,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command '{0}' (try vad, result, audio, say, status, quit)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("'{0}' is not a confidence score")]
    Confidence(String),
}

pub fn parse(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    match word.to_lowercase().as_str() {
        "vad" => Ok(Command::Vad),
        "result" => {
            let (score, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if score.is_empty() {
                return Err(CommandError::Usage("result <confidence> [text]"));
            }
            let confidence = score
                .parse::<f32>()
                .map_err(|_| CommandError::Confidence(score.to_string()))?;
            Ok(Command::Result {
                confidence,
                text: text.trim().to_string(),
            })
        }
        "audio" if !rest.is_empty() => Ok(Command::Audio(PathBuf::from(rest))),
        "audio" => Err(CommandError::Usage("audio <file>")),
        "say" if !rest.is_empty() => Ok(Command::Say(rest.to_string())),
        "say" => Err(CommandError::Usage("say <text>")),
        "status" => Ok(Command::Status),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_result_with_text() {
        assert_eq!(
            parse("result 0.91  wait, stop please"),
            Ok(Command::Result {
                confidence: 0.91,
                text: "wait, stop please".to_string()
            })
        );
        assert_eq!(
            parse("result 0.2"),
            Ok(Command::Result {
                confidence: 0.2,
                text: String::new()
            })
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            parse("result loud"),
            Err(CommandError::Confidence("loud".to_string()))
        );
        assert!(matches!(parse("result"), Err(CommandError::Usage(_))));
        assert!(matches!(parse("say"), Err(CommandError::Usage(_))));
        assert_eq!(parse("dance"), Err(CommandError::Unknown("dance".to_string())));
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse("  VAD "), Ok(Command::Vad));
        assert_eq!(parse("say good morning"), Ok(Command::Say("good morning".into())));
        assert_eq!(parse("audio clip.wav"), Ok(Command::Audio("clip.wav".into())));
        assert_eq!(parse("status"), Ok(Command::Status));
        assert_eq!(parse("exit"), Ok(Command::Quit));
    }
}
