//! Echo plugin: answers `!echo <text>` with `ECHO: <text>`.

use async_trait::async_trait;
use colloquy_core::error::PluginError;
use colloquy_core::{ConversationTurn, Plugin, PluginResult};

const PREFIX: &str = "!echo ";

pub struct EchoPlugin;

#[async_trait]
impl Plugin for EchoPlugin {
    fn name(&self) -> &str {
        "echo"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    async fn on_message(
        &self,
        message: &str,
        _context: &[ConversationTurn],
    ) -> Result<PluginResult, PluginError> {
        let trimmed = message.trim();
        let matches = trimmed
            .get(..PREFIX.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(PREFIX));
        if !matches {
            return Ok(PluginResult::unhandled());
        }

        let rest = &trimmed[PREFIX.len()..];
        Ok(PluginResult::handled(format!("ECHO: {rest}"))
            .with_meta("plugin", serde_json::json!(self.name())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_prefixed_messages() {
        let result = EchoPlugin.on_message("!echo hola", &[]).await.unwrap();
        assert!(result.handled);
        assert_eq!(result.response.as_deref(), Some("ECHO: hola"));
        assert_eq!(result.meta["plugin"], "echo");
    }

    #[tokio::test]
    async fn prefix_is_case_insensitive_and_trimmed() {
        let result = EchoPlugin.on_message("  !ECHO Hola Mundo  ", &[]).await.unwrap();
        assert_eq!(result.response.as_deref(), Some("ECHO: Hola Mundo"));
    }

    #[tokio::test]
    async fn ignores_other_messages() {
        for msg in ["hola", "!echo", "!echoes", "", "¡¡!!"] {
            let result = EchoPlugin.on_message(msg, &[]).await.unwrap();
            assert!(!result.handled, "{msg:?} should not be handled");
        }
    }
}
