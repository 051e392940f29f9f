//! Resource name templates
//!
//! A template is an object-id pattern with `{name}` placeholders, e.g.
//! `dehumidify_{device_id}` or `{device_id}_param_{param_id}`. The position of
//! the `{device_id}` placeholder selects the identifier layout.
//!
//! Rendered identifiers are read back by [`locate_device_id`], which finds the
//! leftmost ASCII `digits[:_]digits` run and calls it a prefix when it starts
//! within the first [`PREFIX_POSITION_THRESHOLD`] of the object id. A device
//! template is only accepted when a sample rendering reads back with its own
//! layout and device id.

use std::fmt;
use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder that receives the device identifier
pub const DEVICE_PLACEHOLDER: &str = "device_id";

/// Relative position at or below which a device id is treated as a prefix
pub const PREFIX_POSITION_THRESHOLD: f64 = 0.3;

/// Device id rendered when checking that a template reads back
const SAMPLE_DEVICE_ID: &str = "32_153289";

/// Value rendered for every other placeholder during that check
const SAMPLE_VALUE: &str = "x";

static DEVICE_ID_PATTERN: OnceLock<Regex> = OnceLock::new();

fn device_id_pattern() -> &'static Regex {
    DEVICE_ID_PATTERN.get_or_init(|| Regex::new(r"[0-9]+[:_][0-9]+").expect("static pattern"))
}

/// A device id found inside an object id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdSpan {
    /// Byte range of the device id
    pub range: Range<usize>,
    pub layout: TemplateLayout,
}

/// Find the leftmost device id in `object_id` and infer the layout from its
/// position
pub fn locate_device_id(object_id: &str, prefix_threshold: f64) -> Option<DeviceIdSpan> {
    let found = device_id_pattern().find(object_id)?;
    let position = found.start() as f64 / object_id.len() as f64;
    let layout = if position <= prefix_threshold {
        TemplateLayout::Prefix
    } else {
        TemplateLayout::Suffix
    };
    Some(DeviceIdSpan {
        range: found.range(),
        layout,
    })
}

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors raised while parsing or rendering a template
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// Unbalanced braces or an empty placeholder
    #[error("malformed template '{template}': {reason}")]
    Malformed { template: String, reason: String },

    /// A placeholder had no value at render time
    #[error("template '{template}' is missing a value for placeholder '{placeholder}'")]
    MissingPlaceholder {
        template: String,
        placeholder: String,
    },

    /// A device-scoped template without `{device_id}`
    #[error("template '{template}' has no '{{device_id}}' placeholder")]
    MissingDevicePlaceholder { template: String },

    /// A feature-global template that mentions `{device_id}`
    #[error("template '{template}' is feature-global but contains '{{device_id}}'")]
    UnexpectedDevicePlaceholder { template: String },

    /// `{device_id}` neither leads nor trails the template
    #[error("template '{template}' embeds '{{device_id}}' between literal text")]
    EmbeddedDevicePlaceholder { template: String },

    /// Rendered identifiers would not decode back to the template's layout
    #[error("identifiers rendered from template '{template}' read back as {found}")]
    AmbiguousLayout { template: String, found: String },
}

/// Where the device identifier sits inside an identifier's object id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateLayout {
    /// `{device_id}_param_{param_id}`
    Prefix,
    /// `dehumidify_{device_id}`
    Suffix,
    /// No device component
    Global,
    /// Device placeholder between literal text; not invertible
    Embedded,
}

/// One parsed piece of a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template string
    pub fn parse(source: impl Into<String>) -> TemplateResult<Self> {
        let source = source.into();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars();

        let malformed = |reason: &str| TemplateError::Malformed {
            template: source.clone(),
            reason: reason.to_string(),
        };

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        match c {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => return Err(malformed("nested '{'")),
                            _ => name.push(c),
                        }
                    }
                    if !closed {
                        return Err(malformed("unclosed '{'"));
                    }
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(malformed("empty placeholder"));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name.to_string()));
                }
                '}' => return Err(malformed("unmatched '}'")),
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        if segments.is_empty() {
            return Err(malformed("empty template"));
        }

        Ok(Self { source, segments })
    }

    /// Original template text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder names in order of appearance
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn has_device_placeholder(&self) -> bool {
        self.placeholders().any(|p| p == DEVICE_PLACEHOLDER)
    }

    /// Layout implied by the position of `{device_id}`
    pub fn layout(&self) -> TemplateLayout {
        let Some(index) = self
            .segments
            .iter()
            .position(|s| matches!(s, Segment::Placeholder(p) if p == DEVICE_PLACEHOLDER))
        else {
            return TemplateLayout::Global;
        };
        if index == 0 {
            TemplateLayout::Prefix
        } else if index == self.segments.len() - 1 {
            TemplateLayout::Suffix
        } else {
            TemplateLayout::Embedded
        }
    }

    /// Check the template is usable for a device-scoped or feature-global resource
    ///
    /// Device templates must also read back: a sample rendering has to yield
    /// the sample device id under this template's own layout.
    pub fn validate_scope(&self, device_scoped: bool) -> TemplateResult<()> {
        match (device_scoped, self.layout()) {
            (true, TemplateLayout::Global) => Err(TemplateError::MissingDevicePlaceholder {
                template: self.source.clone(),
            }),
            (true, TemplateLayout::Embedded) => Err(TemplateError::EmbeddedDevicePlaceholder {
                template: self.source.clone(),
            }),
            (false, TemplateLayout::Global) => Ok(()),
            (false, _) => Err(TemplateError::UnexpectedDevicePlaceholder {
                template: self.source.clone(),
            }),
            (true, _) => self.check_reads_back(),
        }
    }

    fn check_reads_back(&self) -> TemplateResult<()> {
        let sample = self.render(|name| {
            Some(if name == DEVICE_PLACEHOLDER {
                SAMPLE_DEVICE_ID
            } else {
                SAMPLE_VALUE
            })
        })?;
        let found = match locate_device_id(&sample, PREFIX_POSITION_THRESHOLD) {
            Some(span) if span.layout != self.layout() => format!("{:?} layout", span.layout),
            Some(span) if &sample[span.range.clone()] != SAMPLE_DEVICE_ID => {
                format!("device id '{}'", &sample[span.range])
            }
            Some(_) => return Ok(()),
            None => "no device id".to_string(),
        };
        Err(TemplateError::AmbiguousLayout {
            template: self.source.clone(),
            found,
        })
    }

    /// Substitute every placeholder through `lookup`
    pub fn render<'a, F>(&self, lookup: F) -> TemplateResult<String>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let mut out = String::with_capacity(self.source.len() + 16);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = lookup(name).ok_or_else(|| TemplateError::MissingPlaceholder {
                        template: self.source.clone(),
                        placeholder: name.clone(),
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
