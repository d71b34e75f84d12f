//! Partial implementation of the [Elastic Common Schema (ECS)](https://www.elastic.co/guide/en/ecs/current/ecs-reference.html) for the [`tracing_forest::Formatter`].
//!
//! Reference features are evaluated concurrently, which would interleave their log lines. [`tracing_forest`]
//! groups the events of each `evaluate feature` span, and this formatter condenses each group into a single
//! structured JSON ECS event, producing a new-line-delimited JSON log with one line per reference feature.
//!
//! Only the ECS fields geomatch has values for are implemented. Feature matching results are recorded under a
//! custom `geomatch` field set.

use {
    chrono::{DateTime, Utc},
    quoted_string::spec::{PartialCodePoint, QuotingClass},
    serde::{Deserialize, Serialize},
    std::fmt,
    tracing_forest::tree::{Event, Span, Tree},
    tracing_forest::Formatter,
};

/// The ECS formatter converts a [`Tree`](tracing_forest::tree::Tree) into a formatted [`String`] to be displayed.
///
/// The formatter expects log messages to be short, known messages emitted by geomatch and therefore it is
/// not a reusable component.
///
/// # Example
///
/// This would print log messages in ECS format to stderr.
///
/// ```ignore
/// let layer = tracing_forest::ForestLayer::from(
///     tracing_forest::Printer::new()
///         .formatter(EcsFormatter)
///         .writer(std::io::stderr),
/// );
/// ```
#[derive(Debug)]
pub struct EcsFormatter;

impl Formatter for EcsFormatter {
    type Error = fmt::Error;

    /// Parse a [`tracing_forest::tree::Tree`] and format it as a [`String`] for display.
    fn fmt(&self, tree: &Tree) -> Result<String, fmt::Error> {
        let mut ecs_event = EcsEvent::default();
        EcsFormatter::parse_tree(tree, &mut ecs_event)?;
        // Only the root's level is recorded, nested events would otherwise override it.
        EcsFormatter::parse_level(tree, &mut ecs_event);
        serde_json::to_string(&ecs_event)
            // The newline must be present to flush the writer and to produce valid newline-delimited JSON
            .map(|json| json.trim().to_string() + "\n")
            .map_err(|_| fmt::Error)
    }
}

impl EcsFormatter {
    fn parse_tree(tree: &Tree, ecs_event: &mut EcsEvent) -> fmt::Result {
        match tree {
            Tree::Event(event) => EcsFormatter::parse_event(event, ecs_event),
            Tree::Span(span) => EcsFormatter::parse_span(span, ecs_event),
        }
    }

    fn parse_level(tree: &Tree, ecs_event: &mut EcsEvent) {
        let level = match tree {
            Tree::Event(event) => event.level(),
            Tree::Span(span) => span.level(),
        };
        let mut log = ecs_event.log.clone().unwrap_or_default();
        log.level = level.as_str().to_ascii_lowercase();
        ecs_event.log = Some(log);
    }

    fn parse_event(event: &Event, ecs_event: &mut EcsEvent) -> fmt::Result {
        ecs_event.timestamp = event.timestamp();

        let Some(message) = event.message() else {
            return Ok(());
        };
        let message = unquote(message);
        match message.as_str() {
            "feature verdict" => EcsFormatter::parse_feature_verdict_event(event, ecs_event)?,
            "feature failed" | "feature timed out" => {
                EcsFormatter::parse_feature_failure_event(event, ecs_event)?
            }
            "batch complete" => EcsFormatter::parse_batch_complete_event(event, ecs_event)?,
            _ => {
                // Nested events within a feature span should not replace the verdict message.
                if ecs_event.message.is_empty() {
                    ecs_event.message = message;
                }
            }
        }
        Ok(())
    }

    /// Parses `"feature verdict"` messages emitted once a reference feature has been evaluated.
    fn parse_feature_verdict_event(event: &Event, ecs_event: &mut EcsEvent) -> fmt::Result {
        let mut event_meta = ecs_event.event.clone().unwrap_or_default();
        event_meta.kind = Some(String::from("event"));
        event_meta.category = Some(vec![String::from("process")]);
        event_meta.outcome = Some(String::from("success"));
        ecs_event.event = Some(event_meta);

        let mut geomatch = ecs_event.geomatch.clone().unwrap_or_default();
        for field in event.fields().iter() {
            match field.key() {
                "reference" => geomatch.reference = Some(unquote(field.value())),
                "verdict" => geomatch.verdict = Some(unquote(field.value())),
                "candidate" => geomatch.candidate = Some(unquote(field.value())),
                "conflict" => {
                    geomatch.conflict =
                        Some(str::parse::<f64>(field.value()).map_err(|_| fmt::Error)?);
                }
                "candidates" => {
                    geomatch.candidates =
                        Some(str::parse::<usize>(field.value()).map_err(|_| fmt::Error)?);
                }
                _ => {}
            }
        }

        ecs_event.message = match (&geomatch.verdict, &geomatch.candidate) {
            (Some(verdict), Some(candidate)) => format!(
                "{} {} {}",
                geomatch.reference.as_deref().unwrap_or_default(),
                verdict,
                candidate
            ),
            (Some(verdict), None) => format!(
                "{} {}",
                geomatch.reference.as_deref().unwrap_or_default(),
                verdict
            ),
            _ => String::from("feature verdict"),
        };
        ecs_event.geomatch = Some(geomatch);
        Ok(())
    }

    /// Parses `"feature failed"` and `"feature timed out"` messages emitted by the batch runner.
    fn parse_feature_failure_event(event: &Event, ecs_event: &mut EcsEvent) -> fmt::Result {
        let mut event_meta = ecs_event.event.clone().unwrap_or_default();
        event_meta.kind = Some(String::from("event"));
        event_meta.category = Some(vec![String::from("process")]);
        event_meta.outcome = Some(String::from("failure"));
        ecs_event.event = Some(event_meta);

        let mut geomatch = ecs_event.geomatch.clone().unwrap_or_default();
        for field in event.fields().iter() {
            match field.key() {
                "reference" => geomatch.reference = Some(unquote(field.value())),
                "error_message" => {
                    let mut error = ecs_event.error.clone().unwrap_or_default();
                    error.message = unquote(field.value());
                    ecs_event.error = Some(error);
                }
                _ => {}
            }
        }
        ecs_event.message = unquote(event.message().unwrap_or_default());
        ecs_event.geomatch = Some(geomatch);
        Ok(())
    }

    /// Parses `"batch complete"` messages emitted once every feature of a dataset has been processed.
    fn parse_batch_complete_event(event: &Event, ecs_event: &mut EcsEvent) -> fmt::Result {
        let mut event_meta = ecs_event.event.clone().unwrap_or_default();
        event_meta.kind = Some(String::from("metric"));
        event_meta.category = Some(vec![String::from("process")]);
        ecs_event.event = Some(event_meta);

        let mut batch = EcsBatchFieldSet::default();
        for field in event.fields().iter() {
            let count = || str::parse::<usize>(field.value()).map_err(|_| fmt::Error);
            match field.key() {
                "features" => batch.features = count()?,
                "evaluated" => batch.evaluated = count()?,
                "failed" => batch.failed = count()?,
                "timed_out" => batch.timed_out = count()?,
                _ => {}
            }
        }
        let mut geomatch = ecs_event.geomatch.clone().unwrap_or_default();
        geomatch.batch = Some(batch);
        ecs_event.geomatch = Some(geomatch);
        ecs_event.message = String::from("batch complete");
        Ok(())
    }

    /// Parses a [`Span`] into an [`EcsEvent`] by folding in every nested event.
    fn parse_span(span: &Span, ecs_event: &mut EcsEvent) -> fmt::Result {
        let mut event_meta = ecs_event.event.clone().unwrap_or_default();
        if event_meta.duration.is_none() {
            event_meta.duration = Some(span.total_duration().as_nanos() as u64);
        }
        ecs_event.event = Some(event_meta);

        for tree in span.nodes() {
            EcsFormatter::parse_tree(tree, ecs_event)?;
        }
        Ok(())
    }
}

/// Removes the double quotes tracing adds around string field values, if they're present.
fn unquote(value: &str) -> String {
    quoted_string::to_content::<TraceQuoteSpec>(value)
        .map(|content| content.to_string())
        .unwrap_or_else(|_| value.to_string())
}

/// Quote spec for parsing the quoted strings emitted as field values by tracing.
#[derive(Copy, Clone, Debug)]
struct TraceQuoteSpec;

impl quoted_string::spec::GeneralQSSpec for TraceQuoteSpec {
    type Quoting = Self;
    type Parsing = TraceParsingImpl;
}

impl quoted_string::spec::QuotingClassifier for TraceQuoteSpec {
    fn classify_for_quoting(pcp: PartialCodePoint) -> QuotingClass {
        if !is_valid_pcp(pcp) {
            QuotingClass::Invalid
        } else {
            match pcp.as_u8() {
                b'"' | b'\\' => QuotingClass::NeedsQuoting,
                _ => QuotingClass::QText,
            }
        }
    }
}

fn is_valid_pcp(pcp: PartialCodePoint) -> bool {
    let bch = pcp.as_u8();
    (b' '..=b'~').contains(&bch)
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
struct TraceParsingImpl;

impl quoted_string::spec::ParsingImpl for TraceParsingImpl {
    fn can_be_quoted(pcp: PartialCodePoint) -> bool {
        is_valid_pcp(pcp)
    }
    fn handle_normal_state(
        pcp: PartialCodePoint,
    ) -> Result<(quoted_string::spec::State<Self>, bool), quoted_string::error::CoreError> {
        if is_valid_pcp(pcp) {
            Ok((quoted_string::spec::State::Normal, true))
        } else {
            Err(quoted_string::error::CoreError::InvalidChar)
        }
    }

    fn advance(
        &self,
        pcp: PartialCodePoint,
    ) -> Result<(quoted_string::spec::State<Self>, bool), quoted_string::error::CoreError> {
        if is_valid_pcp(pcp) {
            Ok((quoted_string::spec::State::Normal, false))
        } else {
            Err(quoted_string::error::CoreError::InvalidChar)
        }
    }
}

#[derive(Serialize, Deserialize, Default, Debug)]
pub(crate) struct EcsEvent {
    /// Date/time when the event originated, which will be formatted as a string in RFC3339 format.
    #[serde(
        default = "default_timestamp_now",
        rename(serialize = "@timestamp", deserialize = "@timestamp")
    )]
    timestamp: DateTime<Utc>,
    /// The primary message to be logged.
    message: String,
    /// Details about the event's logging mechanism or logging transport.
    #[serde(skip_serializing_if = "Option::is_none")]
    log: Option<EcsLogFieldSet>,
    /// The event fields are used for context information about the log or metric event itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<EcsEventFieldSet>,
    /// Errors encountered while processing the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<EcsErrorFieldSet>,
    /// The custom field values namespaced for geomatch.
    #[serde(skip_serializing_if = "Option::is_none")]
    geomatch: Option<EcsGeomatchFieldSet>,
}

fn default_timestamp_now() -> DateTime<Utc> {
    Utc::now()
}

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub(crate) struct EcsEventFieldSet {
    /// Kind represents high-level information about what type of information the event contains.
    ///
    /// geomatch emits `event` for feature results and `metric` for batch totals.
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    /// Category represents a wider range of classification under ECS.
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<Vec<String>>,
    /// Outcome denotes whether the event represents a success or a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<String>,
    /// Duration of the event in nanoseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<u64>,
}

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub(crate) struct EcsLogFieldSet {
    /// Original log level of the log event.
    level: String,
}

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub(crate) struct EcsErrorFieldSet {
    /// Error message.
    message: String,
}

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub(crate) struct EcsGeomatchFieldSet {
    /// The id of the reference feature.
    #[serde(skip_serializing_if = "Option::is_none")]
    reference: Option<String>,
    /// `matched`, `no_match` or `ambiguous`.
    #[serde(skip_serializing_if = "Option::is_none")]
    verdict: Option<String>,
    /// The matched candidate id.
    #[serde(skip_serializing_if = "Option::is_none")]
    candidate: Option<String>,
    /// The aggregate conflict of the combined evidence.
    #[serde(skip_serializing_if = "Option::is_none")]
    conflict: Option<f64>,
    /// The number of candidates the reference was evaluated against.
    #[serde(skip_serializing_if = "Option::is_none")]
    candidates: Option<usize>,
    /// Totals for a whole dataset.
    #[serde(skip_serializing_if = "Option::is_none")]
    batch: Option<EcsBatchFieldSet>,
}

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub(crate) struct EcsBatchFieldSet {
    features: usize,
    evaluated: usize,
    failed: usize,
    timed_out: usize,
}
