use crate::config::ButtonMapping;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::process::Command;

/// Runs the shell commands bound to buttons.
pub struct CommandExecutor;

impl CommandExecutor {
    pub fn execute(command: &str) -> Result<()> {
        debug!("Executing command: {}", command);

        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .context(format!("Failed to execute command: {}", command))?;

        if !output.stdout.is_empty() {
            debug!("Command output: {}", String::from_utf8_lossy(&output.stdout));
        }

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                "Command execution failed with status: {:?}. Error: {}",
                output.status, stderr
            );
            Err(anyhow::anyhow!(
                "Command failed with status: {:?}",
                output.status
            ))
        }
    }

    /// Run the command bound by `mapping`.
    pub fn run_binding(mapping: &ButtonMapping) -> Result<()> {
        let label = mapping
            .description
            .as_deref()
            .unwrap_or(mapping.command.as_str());
        info!("{} pressed: {}", mapping.button, label);
        Self::execute(mapping.command.trim())
            .context(format!("Binding for {} failed", mapping.button))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buttons::Button;

    #[test]
    fn test_execute_success() {
        let result = CommandExecutor::execute("echo 'test'");
        assert!(result.is_ok());
    }

    #[test]
    fn test_execute_failure() {
        let result = CommandExecutor::execute("false");
        assert!(result.is_err());
    }

    #[test]
    fn test_run_binding() {
        let mapping = ButtonMapping {
            button: Button::Select,
            command: "  true  ".to_string(),
            description: None,
        };
        assert!(CommandExecutor::run_binding(&mapping).is_ok());

        let mapping = ButtonMapping {
            button: Button::Select,
            command: "exit 3".to_string(),
            description: Some("Always fails".to_string()),
        };
        let err = CommandExecutor::run_binding(&mapping).unwrap_err();
        assert!(err.to_string().contains("Select"));
    }
}
