//! The `@var` directive parser and the two-tier variable table.
//!
//! Directives live anywhere in a shader source file, one per line, usually
//! inside comments:
//!
//! ```text
//! // @var vec3 lightDir 0.2 1.0 0.1 dir
//! // @var vec3 skyTint 0.4 0.6 0.9 color
//! // @var float gain 0.5 0.0 1.0 0.01
//! // @var tex0 rocks.png
//! // @var eyePos 0 1.5 4
//! ```
//!
//! Typed `vec3`/`float` declarations become [`ShaderVariable`]s; any other
//! line with at least two tokens lands verbatim in a string table consumed by
//! readers that know the key (`texN`, `eyePos`, `headSize`). Lines that fit
//! neither shape are skipped without complaint, so directives can coexist
//! with arbitrary commentary.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use glam::Vec3;
use tracing::debug;

use crate::variable::{ShaderVariable, VariableKind};

const DIRECTIVE_NEEDLE: &str = "@var ";

/// One parsed `@var` line.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Directive {
    Typed { name: String, var: ShaderVariable },
    Text { key: String, value: String },
}

/// Extracts and parses the directive on `line`, if any.
pub(crate) fn parse_directive(line: &str) -> Option<Directive> {
    let at = line.find(DIRECTIVE_NEEDLE)?;
    let decl = line[at + DIRECTIVE_NEEDLE.len()..].trim();
    let tokens: Vec<&str> = decl.split_whitespace().collect();

    match *tokens.first()? {
        "vec3" if tokens.len() >= 5 => {
            let x = tokens[2].parse().ok()?;
            let y = tokens[3].parse().ok()?;
            let z = tokens[4].parse().ok()?;
            let kind = match tokens.get(5).copied() {
                Some("color") => VariableKind::Color,
                // `dir`, an unknown tag, or nothing at all: direction.
                _ => VariableKind::Direction,
            };
            Some(Directive::Typed {
                name: tokens[1].to_string(),
                var: ShaderVariable::vector(kind, Vec3::new(x, y, z)),
            })
        }
        "float" if tokens.len() >= 3 => {
            let value = tokens[2].parse().ok()?;
            let min = parse_or_zero(tokens.get(3))?;
            let max = parse_or_zero(tokens.get(4))?;
            let increment = parse_or_zero(tokens.get(5))?;
            Some(Directive::Typed {
                name: tokens[1].to_string(),
                var: ShaderVariable::scalar(value, min, max, increment),
            })
        }
        _ if tokens.len() >= 2 => {
            let (key, rest) = decl.split_once(char::is_whitespace)?;
            Some(Directive::Text {
                key: key.to_string(),
                value: rest.trim().to_string(),
            })
        }
        _ => None,
    }
}

/// Absent optional fields default to zero; a present-but-garbled field voids
/// the whole line.
fn parse_or_zero(token: Option<&&str>) -> Option<f32> {
    match token {
        Some(raw) => raw.parse().ok(),
        None => Some(0.0),
    }
}

/// Typed tunables plus the free-form string table for one shader.
///
/// Built in two passes: [`VariableTable::from_source`] establishes every
/// variable (kind, initial value, scalar range) from the shader itself, then
/// [`VariableTable::merge_settings`] lets a sibling settings file override
/// current values without disturbing the declared initials, so "reset to
/// source default" keeps working after edits have been persisted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VariableTable {
    vars: BTreeMap<String, ShaderVariable>,
    strings: BTreeMap<String, String>,
}

impl VariableTable {
    /// First pass: scans the shader source for `@var` directives.
    pub fn from_source(source: &str) -> Self {
        let mut table = Self::default();
        for line in source.lines() {
            match parse_directive(line) {
                Some(Directive::Typed { name, var }) => {
                    table.vars.insert(name, var);
                }
                Some(Directive::Text { key, value }) => {
                    table.strings.insert(key, value);
                }
                None => {}
            }
        }
        table
    }

    /// Second pass: applies a settings file over the source declarations.
    ///
    /// Only `value` is overwritten, and only for names the source already
    /// declared with the same kind; stale or mistyped settings entries are
    /// skipped. String keys merge freely, last write wins.
    pub fn merge_settings(&mut self, settings: &str) {
        for line in settings.lines() {
            match parse_directive(line) {
                Some(Directive::Typed { name, var }) => match self.vars.get_mut(&name) {
                    Some(existing) if existing.kind == var.kind => {
                        existing.value = var.value;
                    }
                    Some(existing) => {
                        debug!(
                            name,
                            declared = ?existing.kind,
                            saved = ?var.kind,
                            "settings entry kind mismatch; ignoring"
                        );
                    }
                    None => {
                        debug!(name, "settings entry has no source declaration; ignoring");
                    }
                },
                Some(Directive::Text { key, value }) => {
                    self.strings.insert(key, value);
                }
                None => {}
            }
        }
    }

    /// Restores every variable to its source-declared value. Ranges and
    /// increments are untouched.
    pub fn reset_values(&mut self) {
        for var in self.vars.values_mut() {
            var.reset();
        }
    }

    /// Serializes the typed table in the directive grammar, one per line.
    /// Reparsing the output reproduces it modulo float text precision.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (name, var) in &self.vars {
            match var.kind {
                VariableKind::Scalar => {
                    let _ = writeln!(
                        out,
                        "@var float {name} {} {} {} {}",
                        var.value.x, var.min, var.max, var.increment
                    );
                }
                VariableKind::Direction | VariableKind::Color => {
                    let tag = if var.kind == VariableKind::Color {
                        "color"
                    } else {
                        "dir"
                    };
                    let _ = writeln!(
                        out,
                        "@var vec3 {name} {} {} {} {tag}",
                        var.value.x, var.value.y, var.value.z
                    );
                }
            }
        }
        out
    }

    pub fn get(&self, name: &str) -> Option<&ShaderVariable> {
        self.vars.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ShaderVariable> {
        self.vars.get_mut(name)
    }

    /// Name-sorted iteration; the order doubles as the uniform slot order.
    pub fn vars(&self) -> impl Iterator<Item = (&str, &ShaderVariable)> {
        self.vars.iter().map(|(name, var)| (name.as_str(), var))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }

    /// `"tex{channel}"` binding, or an empty string when unbound.
    pub fn texture_filename(&self, channel: usize) -> String {
        self.string(&format!("tex{channel}"))
            .unwrap_or_default()
            .to_string()
    }

    /// `eyePos` as three whitespace-separated numbers; zero when absent or
    /// short. Extra tokens are ignored.
    pub fn head_pos(&self) -> Vec3 {
        let Some(raw) = self.string("eyePos") else {
            return Vec3::ZERO;
        };
        let mut it = raw.split_whitespace().map(|tok| tok.parse::<f32>());
        match (it.next(), it.next(), it.next()) {
            (Some(Ok(x)), Some(Ok(y)), Some(Ok(z))) => Vec3::new(x, y, z),
            _ => Vec3::ZERO,
        }
    }

    /// `headSize` as one number, 1.0 when absent or unparseable.
    pub fn head_size(&self) -> f32 {
        self.string("headSize")
            .and_then(|raw| raw.split_whitespace().next())
            .and_then(|tok| tok.parse().ok())
            .unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
// A minimal raymarcher.
// @var vec3 lightDir 0 1 0 dir
// @var vec3 tint 0.9 0.5 0.2 color
// @var float gain 0.5 0.0 1.0 0.01
// @var tex0 rocks.png
// @var eyePos 0 1.5 4
// @var headSize 0.5
// @var oops
vec3 getSceneColor(in vec3 ro, in vec3 rd) { return rd; }
"#;

    #[test]
    fn parses_typed_and_text_directives() {
        let table = VariableTable::from_source(SOURCE);
        assert_eq!(table.len(), 3);

        let gain = table.get("gain").unwrap();
        assert_eq!(gain.kind, VariableKind::Scalar);
        assert_eq!(gain.scalar_value(), 0.5);
        assert_eq!(gain.min, 0.0);
        assert_eq!(gain.max, 1.0);
        assert_eq!(gain.increment, 0.01);

        let light = table.get("lightDir").unwrap();
        assert_eq!(light.kind, VariableKind::Direction);
        assert_eq!(light.value, Vec3::new(0.0, 1.0, 0.0));

        let tint = table.get("tint").unwrap();
        assert_eq!(tint.kind, VariableKind::Color);

        assert_eq!(table.string("tex0"), Some("rocks.png"));
        // Single-token lines are not directives.
        assert_eq!(table.string("oops"), None);
    }

    #[test]
    fn untagged_vec3_defaults_to_direction() {
        let table = VariableTable::from_source("// @var vec3 wind 1 0 0");
        assert_eq!(table.get("wind").unwrap().kind, VariableKind::Direction);
    }

    #[test]
    fn unknown_tag_defaults_to_direction() {
        let table = VariableTable::from_source("// @var vec3 wind 1 0 0 wobble");
        assert_eq!(table.get("wind").unwrap().kind, VariableKind::Direction);
    }

    #[test]
    fn short_and_garbled_lines_are_skipped() {
        let table = VariableTable::from_source(
            "// @var vec3 broken 1 2\n// @var float alone\n// @var float bad zero\n",
        );
        assert!(table.is_empty());
        assert!(table.strings.is_empty());
    }

    #[test]
    fn float_with_no_range_defaults_to_zeroes() {
        let table = VariableTable::from_source("// @var float speed 2.5");
        let speed = table.get("speed").unwrap();
        assert_eq!(speed.scalar_value(), 2.5);
        assert_eq!((speed.min, speed.max, speed.increment), (0.0, 0.0, 0.0));
        assert!(!speed.has_range());
    }

    #[test]
    fn settings_override_value_but_not_the_declaration() {
        let mut table = VariableTable::from_source("// @var float gain 0.5 0.0 1.0 0.01");
        table.merge_settings("@var float gain 0.75 9.0 9.0 9.0");

        let gain = table.get("gain").unwrap();
        assert_eq!(gain.scalar_value(), 0.75);
        assert_eq!(gain.initial.x, 0.5);
        assert_eq!((gain.min, gain.max, gain.increment), (0.0, 1.0, 0.01));
    }

    #[test]
    fn settings_cannot_invent_variables() {
        let mut table = VariableTable::from_source("// @var float gain 0.5");
        table.merge_settings("@var float phantom 1.0");
        assert!(table.get("phantom").is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn settings_kind_mismatch_is_ignored() {
        let mut table = VariableTable::from_source("// @var vec3 lightDir 0 1 0 dir");
        table.merge_settings("@var float lightDir 3.0");
        let light = table.get("lightDir").unwrap();
        assert_eq!(light.kind, VariableKind::Direction);
        assert_eq!(light.value, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn settings_strings_merge_with_last_write_winning() {
        let mut table = VariableTable::from_source("// @var tex0 rocks.png");
        table.merge_settings("@var tex0 moss.png\n@var tex1 tiles.png");
        assert_eq!(table.texture_filename(0), "moss.png");
        assert_eq!(table.texture_filename(1), "tiles.png");
    }

    #[test]
    fn reset_restores_initials_and_keeps_ranges() {
        let mut table = VariableTable::from_source(
            "// @var float gain 0.5 0.0 1.0 0.01\n// @var vec3 tint 0.1 0.2 0.3 color",
        );
        table.merge_settings("@var float gain 0.9");
        table.get_mut("tint").unwrap().value = Vec3::splat(7.0);

        table.reset_values();

        let gain = table.get("gain").unwrap();
        assert_eq!(gain.scalar_value(), 0.5);
        assert_eq!((gain.min, gain.max, gain.increment), (0.0, 1.0, 0.01));
        assert_eq!(table.get("tint").unwrap().value, Vec3::new(0.1, 0.2, 0.3));
    }

    #[test]
    fn serialize_round_trips_through_the_parser() {
        let source = "// @var float gain 0.5 0.0 1.0 0.01\n\
                      // @var vec3 lightDir 0 1 0 dir\n\
                      // @var vec3 tint 0.25 0.5 0.75 color";
        let mut table = VariableTable::from_source(source);
        table.get_mut("gain").unwrap().value.x = 0.66;

        let saved = table.serialize();
        let mut reparsed = VariableTable::from_source(source);
        reparsed.merge_settings(&saved);

        assert_eq!(reparsed, table);
    }

    #[test]
    fn serialized_lines_use_the_directive_grammar() {
        let table = VariableTable::from_source("// @var float gain 0.5 0.0 1.0 0.01");
        let saved = table.serialize();
        assert_eq!(saved.trim(), "@var float gain 0.5 0 1 0.01");
    }

    #[test]
    fn aux_defaults_when_keys_are_missing() {
        let table = VariableTable::default();
        assert_eq!(table.texture_filename(3), "");
        assert_eq!(table.head_pos(), Vec3::ZERO);
        assert_eq!(table.head_size(), 1.0);
    }

    #[test]
    fn aux_lookups_parse_bound_keys() {
        let table = VariableTable::from_source(SOURCE);
        assert_eq!(table.head_pos(), Vec3::new(0.0, 1.5, 4.0));
        assert_eq!(table.head_size(), 0.5);
        assert_eq!(table.texture_filename(0), "rocks.png");
    }

    #[test]
    fn directive_needle_can_sit_mid_line() {
        let table = VariableTable::from_source("float a = 1.0; // @var float gain 0.25");
        assert_eq!(table.get("gain").unwrap().scalar_value(), 0.25);
    }

    #[test]
    fn garbled_optional_field_voids_the_line() {
        // A block-comment terminator lands where `min` would be.
        let table = VariableTable::from_source("/* @var float gain 0.25 */");
        assert!(table.get("gain").is_none());
    }
}
