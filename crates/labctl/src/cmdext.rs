use std::process::Command;

pub trait CommandRunExt {
    fn run(&mut self) -> std::io::Result<()>;
}

impl CommandRunExt for Command {
    fn run(&mut self) -> std::io::Result<()> {
        let status = self.status()?;
        if status.success() {
            Ok(())
        } else {
            Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("command exited with status {status}"),
            ))
        }
    }
}
