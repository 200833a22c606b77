//! C ABI exports of the native module.
//!
//! Each export takes NUL-terminated UTF-8 strings (null for an omitted
//! optional argument) and returns a status: `0` on success, a positive value
//! for a completed check that found problems, `-1` on error. Errors are
//! logged before returning. Asynchronous work runs on a current-thread tokio
//! runtime that lives for the duration of the call.

use anyhow::{Context, Result, anyhow, bail};
use log::error;
use std::ffi::{CStr, c_char};
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use crate::binding::{CHECK_PUBLISH, CHECK_ROUTERS, GEN_ALL_CHANGELOGS, GEN_CHANGELOGS};
use crate::commands;
use crate::config::ToolConfig;
use crate::runtime::RealRuntime;

const FAILURE: i32 = -1;

/// `checkRouters(repo, routesFile?)`: number of route issues found.
///
/// # Safety
///
/// Both pointers must be null or point to NUL-terminated strings that stay
/// valid for the duration of the call.
#[unsafe(export_name = "checkRouters")]
pub unsafe extern "C" fn check_routers(repo: *const c_char, routes_file: *const c_char) -> i32 {
    run_export(CHECK_ROUTERS, || {
        let repo = unsafe { required_path(repo, "repo") }?;
        let routes_file = unsafe { optional_path(routes_file) }?;
        let issues = commands::check_routers(&RealRuntime, &repo, routes_file.as_deref())?;
        Ok(i32::try_from(issues.len()).unwrap_or(i32::MAX))
    })
}

/// `genChangelogs(repo, changelogPath?)`.
///
/// # Safety
///
/// See [`check_routers`].
#[unsafe(export_name = "genChangelogs")]
pub unsafe extern "C" fn gen_changelogs(repo: *const c_char, changelog_path: *const c_char) -> i32 {
    run_export(GEN_CHANGELOGS, || {
        let repo = unsafe { required_path(repo, "repo") }?;
        let changelog_path = unsafe { optional_path(changelog_path) }?;
        let config = ToolConfig::from_env(&RealRuntime);
        block_on(commands::gen_changelogs(
            &RealRuntime,
            &repo,
            changelog_path.as_deref(),
            &config,
        ))??;
        Ok(0)
    })
}

/// `genAllChangelogs(repo, changelogPath?)`.
///
/// # Safety
///
/// See [`check_routers`].
#[unsafe(export_name = "genAllChangelogs")]
pub unsafe extern "C" fn gen_all_changelogs(
    repo: *const c_char,
    changelog_path: *const c_char,
) -> i32 {
    run_export(GEN_ALL_CHANGELOGS, || {
        let repo = unsafe { required_path(repo, "repo") }?;
        let changelog_path = unsafe { optional_path(changelog_path) }?;
        let config = ToolConfig::from_env(&RealRuntime);
        block_on(commands::gen_all_changelogs(
            &RealRuntime,
            &repo,
            changelog_path.as_deref(),
            &config,
        ))??;
        Ok(0)
    })
}

/// `checkPublish(repo)`: `1` when some package is not published or could
/// not be retagged.
///
/// # Safety
///
/// `repo` must point to a NUL-terminated string that stays valid for the
/// duration of the call.
#[unsafe(export_name = "checkPublish")]
pub unsafe extern "C" fn check_publish(repo: *const c_char) -> i32 {
    run_export(CHECK_PUBLISH, || {
        let repo = unsafe { required_path(repo, "repo") }?;
        let config = ToolConfig::from_env(&RealRuntime);
        let outcome = block_on(commands::check_publish(&RealRuntime, &repo, &config))??;
        Ok(if outcome.is_success() { 0 } else { 1 })
    })
}

fn run_export<F>(export: &str, body: F) -> i32
where
    F: FnOnce() -> Result<i32>,
{
    init_logging();
    // Unwinding out of an `extern "C"` function aborts the host.
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            error!("{} failed: {:#}", export, e);
            FAILURE
        }
        Err(payload) => {
            error!("{} panicked: {}", export, panic_message(payload.as_ref()));
            FAILURE
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// The module carries its own logger; the host's is not visible from here.
fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init();
}

fn block_on<F: Future>(future: F) -> Result<F::Output> {
    if tokio::runtime::Handle::try_current().is_ok() {
        bail!("Cannot run from a thread that is already driving an async runtime");
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    Ok(runtime.block_on(future))
}

/// # Safety
///
/// `ptr` must be null or a valid NUL-terminated string.
unsafe fn optional_path(ptr: *const c_char) -> Result<Option<PathBuf>> {
    if ptr.is_null() {
        return Ok(None);
    }
    let value = unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .context("Argument is not valid UTF-8")?;
    Ok(Some(PathBuf::from(value)))
}

/// # Safety
///
/// `ptr` must be null or a valid NUL-terminated string.
unsafe fn required_path(ptr: *const c_char, name: &str) -> Result<PathBuf> {
    unsafe { optional_path(ptr) }?.ok_or_else(|| anyhow!("Missing required argument {}", name))
}
