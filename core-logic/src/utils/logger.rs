use chrono::Local;
use nu_ansi_term::{Color, Style};
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Targets,
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields, FormattedFields},
    prelude::*,
    registry::LookupSpan,
    Layer,
};

/// Per-attempt outcome lines are logged under this target.
pub const RESULT_TARGET: &str = "batch_result";

const LOG_DIR: &str = "logs";
const LOG_PREFIX: &str = "flipn";

/// Installs the file + console subscriber.
///
/// `RUST_LOG` (in `Targets` syntax, e.g. `info,core_logic=debug`) replaces
/// the console filter. The returned guard must be kept alive for file
/// logging to flush.
pub fn setup_logger() -> Option<WorkerGuard> {
    std::fs::create_dir_all(LOG_DIR).ok();

    let file_appender = tracing_appender::rolling::hourly(LOG_DIR, LOG_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // File: every batch outcome plus warnings from everything else
    let file_filter = Targets::new()
        .with_target(RESULT_TARGET, Level::INFO)
        .with_target("core_logic", Level::INFO)
        .with_default(Level::WARN);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(file_filter);

    let console_filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|filter| filter.parse::<Targets>().ok())
        .unwrap_or_else(|| {
            Targets::new()
                .with_target(RESULT_TARGET, Level::INFO)
                .with_target("core_logic", Level::INFO)
                .with_target("flipn_project", Level::INFO)
                .with_default(Level::WARN)
        });

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(TerminalFormatter)
        .with_filter(console_filter);

    let installed = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init();

    match installed {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}

// --- Formatters ---

struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

fn event_message(event: &Event<'_>) -> String {
    let mut visitor = MessageVisitor {
        message: String::new(),
    };
    event.record(&mut visitor);
    visitor.message
}

/// Writes `[wallet_id="001"] ` for every span in the event's scope.
fn write_span_context<S, N>(ctx: &FmtContext<'_, S, N>, writer: &mut Writer<'_>) -> fmt::Result
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    if let Some(scope) = ctx.event_scope() {
        for span in scope.from_root() {
            let extensions = span.extensions();
            if let Some(fields) = extensions.get::<FormattedFields<N>>() {
                if !fields.is_empty() {
                    write!(writer, "[{}] ", fields)?;
                }
            }
        }
    }
    Ok(())
}

pub struct TerminalFormatter;

impl<S, N> FormatEvent<S, N> for TerminalFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let msg = event_message(event);

        let colored_msg = if msg.starts_with("Success") {
            let green_text = Style::new().fg(Color::LightGreen).bold();
            msg.replacen("Success", &green_text.paint("Success").to_string(), 1)
        } else if msg.starts_with("Failed") {
            let red_text = Style::new().fg(Color::LightRed).bold();
            msg.replacen("Failed", &red_text.paint("Failed").to_string(), 1)
        } else {
            msg
        };

        match *event.metadata().level() {
            Level::ERROR => write!(writer, "{} ", Color::Red.bold().paint("ERROR"))?,
            Level::WARN => write!(writer, "{} ", Color::Yellow.paint("WARN"))?,
            _ => {}
        }
        write_span_context(ctx, &mut writer)?;
        writeln!(writer, "{}", colored_msg)
    }
}

pub struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let level = event.metadata().level();

        write!(writer, "{} [{}] ", timestamp, level)?;
        write_span_context(ctx, &mut writer)?;
        writeln!(writer, "{}", event_message(event))
    }
}
