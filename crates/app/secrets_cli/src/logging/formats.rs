use flexi_logger::{DeferredNow, style};
use log::{Level, Record};

/// `error: message`, coloured by level. Debug and trace lines also name
/// their module.
pub fn cli_format(
    w: &mut dyn std::io::Write,
    _now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    let level = record.level();
    let label = level.as_str().to_lowercase();
    match level {
        Level::Debug | Level::Trace => write!(
            w,
            "{}: [{}] {}",
            style(level).paint(label),
            record.module_path().unwrap_or("<unnamed>"),
            record.args()
        ),
        _ => write!(w, "{}: {}", style(level).paint(label), record.args()),
    }
}
