/// Validation layer messenger
///
/// Messages from the validation layers are counted, grouped by text and
/// forwarded to the engine logger under the `deferred3d::vulkan::validation`
/// source. A colored summary can be printed at shutdown.

use ash::vk;
use colored::*;
use deferred_3d_engine::{engine_debug, engine_error, engine_info, engine_warn};
use rustc_hash::FxHashMap;
use std::ffi::CStr;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Mutex;

const SOURCE: &str = "deferred3d::vulkan::validation";

/// Which validation messages are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DebugSeverity {
    ErrorsOnly = 0,
    ErrorsAndWarnings = 1,
    All = 2,
}

impl DebugSeverity {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => DebugSeverity::ErrorsOnly,
            1 => DebugSeverity::ErrorsAndWarnings,
            _ => DebugSeverity::All,
        }
    }

    /// True if a message of `severity` passes this filter
    pub fn accepts(&self, severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> bool {
        use vk::DebugUtilsMessageSeverityFlagsEXT as S;
        match self {
            DebugSeverity::ErrorsOnly => severity.contains(S::ERROR),
            DebugSeverity::ErrorsAndWarnings => severity.intersects(S::ERROR | S::WARNING),
            DebugSeverity::All => true,
        }
    }
}

/// Counters of validation messages received since the messenger was set up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

struct StatsTracker {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
}

impl StatsTracker {
    const fn new() -> Self {
        Self {
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            verbose: AtomicU32::new(0),
        }
    }

    fn record(&self, severity: vk::DebugUtilsMessageSeverityFlagsEXT) {
        use vk::DebugUtilsMessageSeverityFlagsEXT as S;
        let counter = if severity.contains(S::ERROR) {
            &self.errors
        } else if severity.contains(S::WARNING) {
            &self.warnings
        } else if severity.contains(S::INFO) {
            &self.info
        } else {
            &self.verbose
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        self.info.store(0, Ordering::Relaxed);
        self.verbose.store(0, Ordering::Relaxed);
    }
}

static STATS: StatsTracker = StatsTracker::new();
static SEVERITY: AtomicU8 = AtomicU8::new(DebugSeverity::ErrorsAndWarnings as u8);

/// Occurrences per message text, `None` while no messenger is installed
static MESSAGES: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

/// Reset counters and start tracking messages
pub fn init_debug_config(severity: DebugSeverity) {
    STATS.reset();
    SEVERITY.store(severity as u8, Ordering::Relaxed);
    if let Ok(mut messages) = MESSAGES.lock() {
        *messages = Some(FxHashMap::default());
    }
}

/// Stop tracking messages; the counters keep their last values
pub fn cleanup_debug_config() {
    if let Ok(mut messages) = MESSAGES.lock() {
        *messages = None;
    }
}

pub fn get_validation_stats() -> ValidationStats {
    STATS.snapshot()
}

/// Print a colored summary of the validation messages received
pub fn print_validation_stats_report() {
    let stats = get_validation_stats();

    if stats.total() == 0 {
        println!("\n{}", "No validation messages".green().bold());
        return;
    }

    println!("\n{}", "=== Validation Statistics ===".bright_blue().bold());
    if stats.errors > 0 {
        println!("  {} {}", "Errors:".red().bold(), stats.errors);
    }
    if stats.warnings > 0 {
        println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
    }
    if stats.info > 0 {
        println!("  {} {}", "Info:".cyan(), stats.info);
    }
    if stats.verbose > 0 {
        println!("  {} {}", "Verbose:".bright_black(), stats.verbose);
    }
    println!("  {} {}", "Total:".white().bold(), stats.total());

    let repeated = MESSAGES
        .lock()
        .ok()
        .and_then(|messages| messages.as_ref().map(|m| m.values().filter(|&&n| n > 1).count()))
        .unwrap_or(0);
    if repeated > 0 {
        println!("  {} message(s) appeared more than once", repeated);
    }
    println!("{}\n", "=============================".bright_blue().bold());
}

/// Count `message` and return how many times it has been seen
fn track_message(message: &str) -> u32 {
    let Ok(mut messages) = MESSAGES.lock() else {
        return 1;
    };
    match messages.as_mut() {
        Some(map) => {
            let count = map.entry(message.to_string()).or_insert(0);
            *count += 1;
            *count
        }
        None => 1,
    }
}

fn message_type_name(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

unsafe fn c_str_or<'a>(ptr: *const std::os::raw::c_char, fallback: &'a str) -> std::borrow::Cow<'a, str> {
    if ptr.is_null() {
        std::borrow::Cow::Borrowed(fallback)
    } else {
        CStr::from_ptr(ptr).to_string_lossy()
    }
}

/// Debug messenger callback installed at instance creation
pub(crate) unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let filter = DebugSeverity::from_u8(SEVERITY.load(Ordering::Relaxed));
    if !filter.accepts(message_severity) {
        return vk::FALSE;
    }
    STATS.record(message_severity);

    let data = &*p_callback_data;
    let id = c_str_or(data.p_message_id_name, "Unknown");
    let message = c_str_or(data.p_message, "No message");
    let kind = message_type_name(message_type);

    let count = track_message(&message);
    let repeat = if count > 1 { format!(" [x{}]", count) } else { String::new() };

    use vk::DebugUtilsMessageSeverityFlagsEXT as S;
    if message_severity.contains(S::ERROR) {
        engine_error!(SOURCE, "[{}]{} {}: {}", kind, repeat, id, message);
    } else if message_severity.contains(S::WARNING) {
        engine_warn!(SOURCE, "[{}]{} {}: {}", kind, repeat, id, message);
    } else if message_severity.contains(S::INFO) {
        engine_info!(SOURCE, "[{}]{} {}: {}", kind, repeat, id, message);
    } else {
        engine_debug!(SOURCE, "[{}]{} {}: {}", kind, repeat, id, message);
    }

    vk::FALSE
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
