//! Runtime abstraction for system operations.
//!
//! Everything the loader and the tools need from the host (environment,
//! file system, stdin, subprocesses) goes through [`Runtime`] so it can be
//! replaced by `MockRuntime` in tests.
//!
//! # Structure
//!
//! - `env` - Environment variables and process information
//! - `fs` - File system operations (read, write, directory)
//! - `process` - Running external programs (`git`, `npm`)
//! - `user` - User interaction (line prompts)

mod env;
mod fs;
mod process;
mod user;

use anyhow::Result;
use std::env as std_env;
use std::path::{Path, PathBuf};

pub use process::{CommandOutput, CommandSpec};

#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    // Environment
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError>;

    /// Path of the running executable.
    fn current_exe(&self) -> Result<PathBuf>;

    // File System
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    fn read_to_string(&self, path: &Path) -> Result<String>;

    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_dir_all(&self, path: &Path) -> Result<()>;

    // Processes
    fn run(&self, command: &CommandSpec) -> Result<CommandOutput>;

    // User interaction
    /// Print `prompt` and return the line typed by the user, trimmed.
    fn prompt(&self, prompt: &str) -> Result<String>;
}

pub struct RealRuntime;

impl Runtime for RealRuntime {
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError> {
        self.env_var_impl(key)
    }

    fn current_exe(&self) -> Result<PathBuf> {
        self.current_exe_impl()
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.write_impl(path, contents)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.read_impl(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.read_to_string_impl(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.exists_impl(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.is_dir_impl(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.is_file_impl(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        self.read_dir_impl(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.create_dir_all_impl(path)
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        self.remove_dir_all_impl(path)
    }

    fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        self.run_impl(command)
    }

    fn prompt(&self, prompt: &str) -> Result<String> {
        self.prompt_impl(prompt)
    }
}
