//! Built-in detectors.

use chrono::Duration;
use regex::Regex;
use serde::Serialize;

use crate::error::{ConfigError, Result};
use crate::models::{Image, Instance, Item, ItemKey, ItemType, KeyPair};

use super::context::DetectionContext;

/// Outcome of a single detector for a single item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    /// Whether deletion is prevented.
    pub prevented: bool,
    /// Why the detector decided as it did.
    pub reason: String,
}

impl Detection {
    /// A detection that prevents deletion.
    #[must_use]
    pub fn prevent(reason: impl Into<String>) -> Self {
        Self {
            prevented: true,
            reason: reason.into(),
        }
    }

    /// A detection that allows deletion.
    #[must_use]
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            prevented: false,
            reason: reason.into(),
        }
    }
}

/// Name patterns that must match an item's whole name.
#[derive(Debug, Clone)]
pub struct ExcludePatterns {
    patterns: Vec<(String, Regex)>,
}

impl ExcludePatterns {
    /// Compiles the given patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if any pattern is not a valid regular expression.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> std::result::Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                // Anchored so the pattern has to cover the full name.
                Regex::new(&format!("^(?:{pattern})$"))
                    .map(|regex| (pattern.to_string(), regex))
                    .map_err(|e| ConfigError::InvalidPattern {
                        pattern: pattern.to_string(),
                        message: e.to_string(),
                    })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// Returns the first pattern that fully matches the name.
    #[must_use]
    pub fn find_match(&self, name: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(_, regex)| regex.is_match(name))
            .map(|(pattern, _)| pattern.as_str())
    }

    /// Returns the source patterns.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|(pattern, _)| pattern.as_str())
    }
}

/// A delete prevention detector.
#[derive(Debug, Clone)]
pub enum Detector {
    /// Prevents deletion of items whose name matches an exclude pattern.
    Exclude(ExcludePatterns),
    /// Prevents deletion of items that are not strictly older than the threshold.
    OlderThan(Duration),
    /// Prevents deletion of images the cloud marks as protected.
    ProtectedImage,
    /// Prevents deletion of images an instance boots from.
    ImageInUse,
    /// Prevents deletion of key-pairs an instance uses.
    KeyPairInUse,
}

impl Detector {
    /// Returns the detector's name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Exclude(_) => "exclude",
            Self::OlderThan(_) => "older-than",
            Self::ProtectedImage => "protected-image",
            Self::ImageInUse => "image-in-use",
            Self::KeyPairInUse => "key-pair-in-use",
        }
    }

    /// Returns true if the detector needs the tenant's instances.
    #[must_use]
    pub const fn needs_instances(&self) -> bool {
        matches!(self, Self::ImageInUse | Self::KeyPairInUse)
    }

    /// Decides whether deletion of the item should be prevented.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracker cannot be read.
    pub async fn detect(&self, item: &Item, context: &DetectionContext<'_>) -> Result<Detection> {
        let detection = match self {
            Self::Exclude(excludes) => detect_excluded(excludes, item),
            Self::OlderThan(threshold) => {
                let age = context.tracker.get_age(item).await?;
                detect_older_than(*threshold, age)
            }
            Self::ProtectedImage => match item {
                Item::Image(image) => detect_protected(image),
                other => not_applicable(other),
            },
            Self::ImageInUse => match item {
                Item::Image(image) => detect_image_in_use(image, context),
                other => not_applicable(other),
            },
            Self::KeyPairInUse => match item {
                Item::KeyPair(key_pair) => detect_key_pair_in_use(key_pair, context),
                other => not_applicable(other),
            },
        };
        Ok(detection)
    }
}

fn not_applicable(item: &Item) -> Detection {
    Detection::allow(format!("Not applicable to {} items", item.item_type()))
}

fn detect_excluded(excludes: &ExcludePatterns, item: &Item) -> Detection {
    if let Some(pattern) = excludes.find_match(item.name()) {
        return Detection::prevent(format!("Exclude matched: {pattern}"));
    }
    let patterns: Vec<&str> = excludes.patterns().collect();
    Detection::allow(format!("Excludes not matched: {patterns:?}"))
}

fn detect_older_than(threshold: Duration, age: Option<Duration>) -> Detection {
    // Untracked items count as brand new and are left for a later run.
    let Some(age) = age else {
        return Detection::prevent(format!(
            "Item age: {} - not older than: {}",
            format_age(Duration::zero()),
            format_age(threshold)
        ));
    };

    let prevented = age <= threshold;
    let reason = format!(
        "Item age: {} - {}older than: {}",
        format_age(age),
        if prevented { "not " } else { "" },
        format_age(threshold)
    );
    Detection { prevented, reason }
}

fn detect_protected(image: &Image) -> Detection {
    let reason = format!(
        "Image is {}marked on OpenStack as protected",
        if image.protected { "" } else { "not " }
    );
    Detection {
        prevented: image.protected,
        reason,
    }
}

/// Instances that will still exist after this run's deletions.
fn surviving_instances<'a>(
    context: &'a DetectionContext<'_>,
) -> impl Iterator<Item = &'a Instance> {
    context.instances.iter().filter(|instance| {
        !context
            .carry_over
            .contains_key(&ItemKey::new(ItemType::Instance, instance.identifier.as_str()))
    })
}

fn ignored_note(context: &DetectionContext<'_>) -> String {
    let ignored = context.instances.len() - surviving_instances(context).count();
    if ignored == 0 {
        String::new()
    } else {
        format!(" (ignoring {ignored} instance(s) marked for deletion)")
    }
}

fn detect_image_in_use(image: &Image, context: &DetectionContext<'_>) -> Detection {
    if let Some(instance) = surviving_instances(context)
        .find(|instance| instance.image.as_deref() == Some(image.identifier.as_str()))
    {
        return Detection::prevent(format!(
            "Image cannot be deleted because it is in use by the instance {}",
            Item::from(instance.clone()).describe(false)
        ));
    }
    Detection::allow(format!(
        "No instances are using the image{}",
        ignored_note(context)
    ))
}

fn detect_key_pair_in_use(key_pair: &KeyPair, context: &DetectionContext<'_>) -> Detection {
    if let Some(instance) = surviving_instances(context)
        .find(|instance| instance.key_name.as_deref() == Some(key_pair.name.as_str()))
    {
        return Detection::prevent(format!(
            "Key pair in use by instance {}",
            Item::from(instance.clone()).describe(false)
        ));
    }
    Detection::allow(format!(
        "No instances are using the key pair{}",
        ignored_note(context)
    ))
}

/// Formats a duration as days, hours, minutes and seconds (e.g. `1d 2h 0m 5s`).
#[must_use]
pub fn format_age(duration: Duration) -> String {
    let total = duration.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.unsigned_abs();

    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{sign}{days}d {hours}h {minutes}m {seconds}s")
    } else if hours > 0 {
        format!("{sign}{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{sign}{minutes}m {seconds}s")
    } else {
        format!("{sign}{seconds}s")
    }
}
