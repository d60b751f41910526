use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use crate::error::{ProjectError, Result};

/// 一次外部程序调用：程序名 + 位置参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: String,
    pub args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for a in &self.args {
            write!(f, " {}", a.to_string_lossy())?;
        }
        Ok(())
    }
}

/// 同步执行命令并返回退出码（被信号终止时为 `None`），是否算失败由调用方决定。
pub trait CommandRunner {
    fn run(&mut self, command: &ExternalCommand) -> Result<Option<i32>>;
}

/// 直接在当前进程环境中执行，继承 stdout/stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, command: &ExternalCommand) -> Result<Option<i32>> {
        let status = Command::new(&command.program)
            .args(&command.args)
            .status()
            .map_err(|source| ProjectError::Launch { program: command.program.clone(), source })?;
        Ok(status.code())
    }
}

/// `write_and_launch` 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchReport {
    pub config_path: PathBuf,
    pub experiment_path: PathBuf,
    pub alignment_dir: PathBuf,
    pub command: ExternalCommand,
    pub exit_code: Option<i32>,
}

impl LaunchReport {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}
