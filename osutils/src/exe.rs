use std::{
    os::unix::process::ExitStatusExt,
    process::{Command, ExitStatus, Output},
};

use anyhow::{anyhow, bail, Context, Error};
use log::trace;

use crate::crate_private::Sealed;

/// Extension for `std::process::Output` to check status and produce
/// anyhow errors carrying the captured stderr/stdout.
pub trait OutputChecker: Sealed {
    fn is_success(&self) -> bool;
    fn exit_code(&self) -> Option<i32>;
    fn end_signal(&self) -> Option<i32>;

    fn process_type(&self) -> &'static str {
        "process"
    }

    fn output(&self) -> String {
        "".into()
    }

    fn error_output(&self) -> String {
        "".into()
    }

    fn output_report(&self) -> String {
        let stdout = self.output();
        let stderr = self.error_output();

        let mut res = String::with_capacity(stdout.len() + stderr.len() + 20);
        if !stdout.is_empty() {
            res += &format!("stdout:\n{stdout}\n");
        }
        if !stderr.is_empty() {
            if !res.is_empty() {
                res += "\n";
            }
            res += &format!("stderr:\n{stderr}\n");
        }
        res
    }

    fn check(&self) -> Result<(), Error> {
        if self.is_success() {
            return Ok(());
        }

        Err(match self.output_report() {
            s if !s.is_empty() => anyhow!("Process output:\n{}", s).context(self.explain_exit()),
            _ => anyhow!("(No output was captured)").context(self.explain_exit()),
        })
    }

    fn check_output(&self) -> Result<String, Error> {
        self.check()?;
        Ok(self.output())
    }

    fn explain_exit(&self) -> String {
        if let Some(code) = self.exit_code() {
            format!("{} exited with status: {code}", self.process_type())
        } else if let Some(signal) = self.end_signal() {
            format!("{} was terminated by signal: {signal}", self.process_type())
        } else {
            format!("{} exited with unknown status", self.process_type())
        }
    }
}

impl Sealed for Output {}

impl OutputChecker for Output {
    fn is_success(&self) -> bool {
        self.status.success()
    }

    fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }

    fn end_signal(&self) -> Option<i32> {
        self.status.end_signal()
    }

    fn error_output(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into()
    }

    fn output(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into()
    }
}

impl Sealed for ExitStatus {}

impl OutputChecker for ExitStatus {
    fn is_success(&self) -> bool {
        self.success()
    }

    fn exit_code(&self) -> Option<i32> {
        self.code()
    }

    fn end_signal(&self) -> Option<i32> {
        self.signal()
    }
}

impl Sealed for Result<Output, std::io::Error> {}

impl OutputChecker for Result<Output, std::io::Error> {
    fn is_success(&self) -> bool {
        self.as_ref().map(|output| output.is_success()).unwrap_or(false)
    }

    fn exit_code(&self) -> Option<i32> {
        self.as_ref().ok().and_then(|output| output.exit_code())
    }

    fn end_signal(&self) -> Option<i32> {
        self.as_ref().ok().and_then(|output| output.end_signal())
    }

    fn error_output(&self) -> String {
        self.as_ref().map(|output| output.error_output()).unwrap_or_default()
    }

    fn output(&self) -> String {
        self.as_ref().map(|output| output.output()).unwrap_or_default()
    }

    fn check(&self) -> Result<(), Error> {
        match self {
            Ok(output) => output.check(),
            Err(e) => bail!("Failed to execute {}: {}", self.process_type(), e),
        }
    }

    fn check_output(&self) -> Result<String, Error> {
        match self {
            Ok(output) => output.check_output(),
            Err(e) => bail!("Failed to execute {}: {}", self.process_type(), e),
        }
    }

    fn explain_exit(&self) -> String {
        match self {
            Ok(output) => output.explain_exit(),
            Err(e) => format!("Failed to execute {}: {}", self.process_type(), e),
        }
    }
}

pub trait RunAndCheck: Sealed {
    fn run_and_check(&mut self) -> Result<(), Error>;
    fn output_and_check(&mut self) -> Result<String, Error>;
    fn render_command(&self) -> String;
}

impl Sealed for Command {}

impl RunAndCheck for Command {
    fn run_and_check(&mut self) -> Result<(), Error> {
        let rendered_command = self.render_command();
        trace!("Executing '{rendered_command}'");
        let result = self.output();
        trace!(
            "Executed '{rendered_command}': {}. Report:\n{}",
            result.explain_exit(),
            result.output_report(),
        );
        result
            .check()
            .with_context(|| format!("Error when running: {}", self.render_command()))
    }

    fn output_and_check(&mut self) -> Result<String, Error> {
        let rendered_command = self.render_command();
        trace!("Executing '{rendered_command}'");
        let result = self.output();
        trace!(
            "Executed '{rendered_command}': {}. Report:\n{}",
            result.explain_exit(),
            result.output_report(),
        );
        result
            .check_output()
            .with_context(|| format!("Error when running: {}", self.render_command()))
    }

    fn render_command(&self) -> String {
        let mut parts = vec![self.get_program().to_string_lossy().to_string()];
        parts.extend(self.get_args().map(|a| a.to_string_lossy().to_string()));
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_and_check_succeeds_for_true() {
        Command::new("true").run_and_check().unwrap();
    }

    #[test]
    fn run_and_check_fails_for_false() {
        assert!(Command::new("false").run_and_check().is_err());
    }

    #[test]
    fn output_and_check_captures_stdout() {
        let mut cmd = Command::new("echo");
        cmd.arg("hello");
        assert_eq!(cmd.output_and_check().unwrap().trim(), "hello");
    }

    #[test]
    fn render_command_joins_program_and_args() {
        let mut cmd = Command::new("mkfs");
        cmd.arg("--type").arg("ext4").arg("/dev/sda1");
        assert_eq!(cmd.render_command(), "mkfs --type ext4 /dev/sda1");
    }
}
