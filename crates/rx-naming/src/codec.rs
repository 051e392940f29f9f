//! Bidirectional mapping between resource descriptors and entity IDs
//!
//! Encoding substitutes a template and prefixes the kind's domain. Decoding
//! looks for a device-id shaped substring (`[0-9]+[:_][0-9]+`, ASCII digits
//! only) and decides from its
//! relative position whether the identifier uses the prefix layout
//! (`number.32_153289_param_7c00`) or the suffix layout
//! (`switch.dehumidify_32_153289`).
//!
//! The position test is a heuristic. The leftmost device-id shaped substring is
//! always the one used, so a local name containing its own `digits_digits`
//! fragment before the device id (e.g. `zone_1_32_153289`) decodes wrongly.
//! Templates are checked for this at registration, see
//! [`Template::validate_scope`]. Callers that know the template should still
//! prefer [`NamingCodec::decode_with_layout`], which anchors the match instead.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use rx_core::{
    locate_device_id, DeviceId, EntityId, EntityKind, Segment, Template, TemplateError,
    TemplateLayout, DEVICE_PLACEHOLDER, PREFIX_POSITION_THRESHOLD,
};
use serde::Serialize;
use tracing::trace;

use crate::error::{NamingError, NamingResult, NotParseable};

static DEVICE_ID_LEADING: OnceLock<Regex> = OnceLock::new();
static DEVICE_ID_TRAILING: OnceLock<Regex> = OnceLock::new();

fn device_id_leading() -> &'static Regex {
    DEVICE_ID_LEADING.get_or_init(|| Regex::new(r"^[0-9]+[:_][0-9]+").expect("static pattern"))
}

fn device_id_trailing() -> &'static Regex {
    DEVICE_ID_TRAILING.get_or_init(|| Regex::new(r"[0-9]+[:_][0-9]+$").expect("static pattern"))
}

/// Placeholder values for one encode call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars(BTreeMap<String, String>);

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variables with `{device_id}` bound to the normalized device id
    pub fn for_device(device_id: &DeviceId) -> Self {
        Self::new().with(DEVICE_PLACEHOLDER, device_id.as_str())
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// Result of decoding an identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedIdentifier {
    /// Domain prefix (`switch`, `number`, ... or any host domain)
    pub domain: String,
    /// Object id with the device id and its separator removed
    pub local_name: String,
    pub device_id: DeviceId,
    /// Layout that was detected or requested
    pub layout: TemplateLayout,
}

impl ParsedIdentifier {
    /// The resource kind, if the domain is one this crate manages
    pub fn kind(&self) -> Option<EntityKind> {
        EntityKind::from_domain(&self.domain)
    }
}

/// Domain prefix of an identifier, without further parsing
pub fn kind_of(identifier: &str) -> Option<&str> {
    identifier
        .split_once('.')
        .map(|(domain, _)| domain)
        .filter(|domain| !domain.is_empty())
}

/// Encoder/decoder for entity IDs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NamingCodec {
    prefix_threshold: f64,
}

impl Default for NamingCodec {
    fn default() -> Self {
        Self {
            prefix_threshold: PREFIX_POSITION_THRESHOLD,
        }
    }
}

impl NamingCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec with a different prefix/suffix threshold (0.0..=1.0)
    pub fn with_prefix_threshold(threshold: f64) -> Self {
        Self {
            prefix_threshold: threshold.clamp(0.0, 1.0),
        }
    }

    /// Render `"{kind}.{substituted_template}"`
    ///
    /// The object id goes through [`EntityId::for_kind`], which lowercases it.
    pub fn encode(
        &self,
        kind: EntityKind,
        template: &Template,
        vars: &TemplateVars,
    ) -> NamingResult<EntityId> {
        let object_id = template.render(|name| vars.get(name))?;
        EntityId::for_kind(kind, &object_id).map_err(|source| NamingError::InvalidIdentifier {
            identifier: format!("{}.{}", kind.domain(), object_id),
            source,
        })
    }

    /// Parse `template` and encode in one step
    pub fn encode_str(
        &self,
        kind: EntityKind,
        template: &str,
        vars: &TemplateVars,
    ) -> NamingResult<EntityId> {
        let template = Template::parse(template)?;
        self.encode(kind, &template, vars)
    }

    /// Decode with automatic prefix/suffix detection
    pub fn decode(&self, identifier: &str) -> Result<ParsedIdentifier, NotParseable> {
        let (domain, rest) = split_identifier(identifier)?;
        let span =
            locate_device_id(rest, self.prefix_threshold).ok_or(NotParseable::NoDeviceId)?;
        trace!(identifier, layout = ?span.layout, "Detected identifier layout");

        Ok(assemble(domain, rest, span.range, span.layout))
    }

    /// Decode with a known layout; the device id must lead or trail the name
    pub fn decode_with_layout(
        &self,
        identifier: &str,
        layout: TemplateLayout,
    ) -> Result<ParsedIdentifier, NotParseable> {
        let (domain, rest) = split_identifier(identifier)?;
        let pattern = match layout {
            TemplateLayout::Prefix => device_id_leading(),
            TemplateLayout::Suffix => device_id_trailing(),
            TemplateLayout::Global | TemplateLayout::Embedded => {
                return Err(NotParseable::UnsupportedLayout(layout))
            }
        };
        let found = pattern.find(rest).ok_or(NotParseable::NoDeviceId)?;
        Ok(assemble(domain, rest, found.range(), layout))
    }

    /// Local name a decode of `encode(kind, template, vars)` is expected to yield
    pub fn local_name(&self, template: &Template, vars: &TemplateVars) -> NamingResult<String> {
        let layout = template.layout();
        let segments = template.segments();
        let mut out = String::new();

        for (index, segment) in segments.iter().enumerate() {
            match segment {
                Segment::Placeholder(name) if name == DEVICE_PLACEHOLDER => {}
                Segment::Placeholder(name) => {
                    let value =
                        vars.get(name)
                            .ok_or_else(|| TemplateError::MissingPlaceholder {
                                template: template.as_str().to_string(),
                                placeholder: name.clone(),
                            })?;
                    out.push_str(value);
                }
                Segment::Literal(text) => {
                    let text = match layout {
                        TemplateLayout::Prefix if index == 1 => {
                            text.strip_prefix('_').unwrap_or(text.as_str())
                        }
                        TemplateLayout::Suffix if index + 2 == segments.len() => {
                            text.strip_suffix('_').unwrap_or(text.as_str())
                        }
                        _ => text.as_str(),
                    };
                    out.push_str(text);
                }
            }
        }
        Ok(out.to_ascii_lowercase())
    }

    /// Unique device ids found in a mixed identifier set
    ///
    /// Identifiers that do not decode are skipped.
    pub fn extract_device_ids<'a, I>(&self, identifiers: I) -> BTreeSet<DeviceId>
    where
        I: IntoIterator<Item = &'a str>,
    {
        identifiers
            .into_iter()
            .filter_map(|id| self.decode(id).ok())
            .map(|parsed| parsed.device_id)
            .collect()
    }
}

fn split_identifier(identifier: &str) -> Result<(&str, &str), NotParseable> {
    let (domain, rest) = identifier
        .split_once('.')
        .ok_or(NotParseable::MissingSeparator)?;
    if domain.is_empty() || rest.is_empty() {
        return Err(NotParseable::EmptyPart);
    }
    Ok((domain, rest))
}

fn assemble(
    domain: &str,
    rest: &str,
    found: Range<usize>,
    layout: TemplateLayout,
) -> ParsedIdentifier {
    let before = &rest[..found.start];
    let after = &rest[found.end..];

    let local_name = match layout {
        TemplateLayout::Prefix => {
            format!("{}{}", before, after.strip_prefix('_').unwrap_or(after))
        }
        _ => format!("{}{}", before.strip_suffix('_').unwrap_or(before), after),
    };

    ParsedIdentifier {
        domain: domain.to_string(),
        local_name,
        device_id: DeviceId::new(&rest[found]),
        layout,
    }
}
