//! Construction of layout values from semi-trusted JSON.
//!
//! Every value that enters the pipeline, whether the caller's current state or
//! the model's proposal, goes through these functions. Out-of-range or unknown
//! values are rejected with the offending field, never replaced by a default.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer};

use crate::layout::model::{
    ComponentCatalog, ComponentConfig, ComponentId, ComponentPatch, ProposedUiState, Theme,
    UiState, VisualizationType, Zone, DEFAULT_SCALE, SCALE_RANGE,
};
use crate::layout::parser::excerpt;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{field}: {reason} (got {value})")]
pub struct FieldError {
    pub field: String,
    pub value: String,
    pub reason: String,
}

const VALUE_EXCERPT_CHARS: usize = 200;

impl FieldError {
    /// Values come from model output, so they are cut to a bounded excerpt.
    pub fn new(field: impl Into<String>, value: impl ToString, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: excerpt(&value.to_string(), VALUE_EXCERPT_CHARS),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawComponent {
    pub id: String,
    pub label: Option<String>,
    pub visible: Option<bool>,
    pub zone: Option<String>,
    pub order: Option<i64>,
    /// `None` when absent, `Some(None)` for an explicit `null`.
    #[serde(default, deserialize_with = "present")]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub bg_color: Option<Option<String>>,
    pub scale: Option<f64>,
    pub is_core: Option<bool>,
    pub visualization_type: Option<String>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUiState {
    pub theme: Option<String>,
    #[serde(default)]
    pub components: Vec<RawComponent>,
}

/// Validates every field the raw component sets. Absent fields stay absent.
pub fn build_component_patch(
    raw: &RawComponent,
    path: &str,
    catalog: &ComponentCatalog,
) -> Result<ComponentPatch, FieldError> {
    let id = ComponentId::parse(&raw.id)
        .ok_or_else(|| FieldError::new(format!("{path}.id"), &raw.id, "unknown component id"))?;
    let core = catalog.is_core(id);

    let zone = raw
        .zone
        .as_deref()
        .map(|zone| {
            Zone::parse(zone)
                .ok_or_else(|| FieldError::new(format!("{path}.zone"), zone, "expected primary or secondary"))
        })
        .transpose()?;

    let visualization_type = raw
        .visualization_type
        .as_deref()
        .map(|kind| {
            VisualizationType::parse(kind).ok_or_else(|| {
                FieldError::new(format!("{path}.visualizationType"), kind, "expected text, bar or ring")
            })
        })
        .transpose()?;

    if let Some(scale) = raw.scale {
        if !scale.is_finite() || !SCALE_RANGE.contains(&scale) {
            return Err(FieldError::new(
                format!("{path}.scale"),
                scale,
                format!("must be within {}..={}", SCALE_RANGE.start(), SCALE_RANGE.end()),
            ));
        }
    }

    if let Some(is_core) = raw.is_core {
        if is_core != core {
            return Err(FieldError::new(
                format!("{path}.isCore"),
                is_core,
                format!("{id} is {}", if core { "a core parameter" } else { "an auxiliary parameter" }),
            ));
        }
    }

    if core {
        if raw.visible == Some(false) {
            return Err(FieldError::new(
                format!("{path}.visible"),
                false,
                format!("core parameter {id} must stay visible"),
            ));
        }
        if zone == Some(Zone::Secondary) {
            return Err(FieldError::new(
                format!("{path}.zone"),
                "secondary",
                format!("core parameter {id} must stay in the primary zone"),
            ));
        }
    }

    Ok(ComponentPatch {
        id,
        label: raw.label.clone().filter(|label| !label.is_empty()),
        visible: raw.visible,
        zone,
        order: raw.order,
        color: raw.color.clone(),
        bg_color: raw.bg_color.clone(),
        scale: raw.scale,
        is_core: raw.is_core,
        visualization_type,
    })
}

/// Turns a patch into a full component, filling label, scale, style and core
/// flag from the catalog. `visible`, `zone` and `order` have no default.
pub fn complete_component(
    patch: &ComponentPatch,
    path: &str,
    catalog: &ComponentCatalog,
) -> Result<ComponentConfig, FieldError> {
    let missing = |field: &str| FieldError::new(format!("{path}.{field}"), "null", "field is required");

    Ok(ComponentConfig {
        id: patch.id,
        label: patch
            .label
            .clone()
            .unwrap_or_else(|| catalog.label(patch.id).to_string()),
        visible: patch.visible.ok_or_else(|| missing("visible"))?,
        zone: patch.zone.ok_or_else(|| missing("zone"))?,
        order: patch.order.ok_or_else(|| missing("order"))?,
        color: patch.color.clone().flatten(),
        bg_color: patch.bg_color.clone().flatten(),
        scale: patch.scale.unwrap_or(DEFAULT_SCALE),
        is_core: patch.is_core.unwrap_or_else(|| catalog.is_core(patch.id)),
        visualization_type: patch.visualization_type.unwrap_or_default(),
    })
}

pub fn build_component(
    raw: &RawComponent,
    path: &str,
    catalog: &ComponentCatalog,
) -> Result<ComponentConfig, FieldError> {
    let patch = build_component_patch(raw, path, catalog)?;
    complete_component(&patch, path, catalog)
}

fn parse_theme(raw: &str, path: &str) -> Result<Theme, FieldError> {
    Theme::parse(raw).ok_or_else(|| FieldError::new(format!("{path}.theme"), raw, "expected dark or light"))
}

pub fn build_proposed_state(
    raw: &RawUiState,
    path: &str,
    catalog: &ComponentCatalog,
) -> Result<ProposedUiState, FieldError> {
    let theme = raw.theme.as_deref().map(|theme| parse_theme(theme, path)).transpose()?;

    let mut seen = HashSet::new();
    let mut components = Vec::with_capacity(raw.components.len());
    for (index, component) in raw.components.iter().enumerate() {
        let component_path = format!("{path}.components[{index}]");
        let patch = build_component_patch(component, &component_path, catalog)?;
        if !seen.insert(patch.id) {
            return Err(FieldError::new(format!("{component_path}.id"), patch.id, "duplicate component id"));
        }
        components.push(patch);
    }

    Ok(ProposedUiState { theme, components })
}

/// Builds an authoritative state: theme required, every component complete,
/// and the state-wide invariants checked by [`validate_state`].
pub fn build_ui_state(
    raw: &RawUiState,
    path: &str,
    catalog: &ComponentCatalog,
) -> Result<UiState, FieldError> {
    let theme = raw
        .theme
        .as_deref()
        .ok_or_else(|| FieldError::new(format!("{path}.theme"), "null", "field is required"))?;
    let theme = parse_theme(theme, path)?;

    let components = raw
        .components
        .iter()
        .enumerate()
        .map(|(index, component)| build_component(component, &format!("{path}.components[{index}]"), catalog))
        .collect::<Result<Vec<_>, _>>()?;

    let state = UiState { theme, components };
    validate_state(&state, path, catalog)?;
    Ok(state)
}

/// Checks the invariants every returned state must hold: unique ids, all core
/// ids present, core components visible in the primary zone, scale in range.
pub fn validate_state(state: &UiState, path: &str, catalog: &ComponentCatalog) -> Result<(), FieldError> {
    let mut seen = HashSet::new();
    for (index, component) in state.components.iter().enumerate() {
        let component_path = format!("{path}.components[{index}]");
        if !seen.insert(component.id) {
            return Err(FieldError::new(format!("{component_path}.id"), component.id, "duplicate component id"));
        }
        if !component.scale.is_finite() || !SCALE_RANGE.contains(&component.scale) {
            return Err(FieldError::new(format!("{component_path}.scale"), component.scale, "out of range"));
        }
        let core = catalog.is_core(component.id);
        if component.is_core != core {
            return Err(FieldError::new(
                format!("{component_path}.isCore"),
                component.is_core,
                "contradicts the component catalog",
            ));
        }
        if core && !component.visible {
            return Err(FieldError::new(
                format!("{component_path}.visible"),
                false,
                format!("core parameter {} must stay visible", component.id),
            ));
        }
        if core && component.zone != Zone::Primary {
            return Err(FieldError::new(
                format!("{component_path}.zone"),
                "secondary",
                format!("core parameter {} must stay in the primary zone", component.id),
            ));
        }
    }

    for core_id in catalog.core_ids() {
        if !seen.contains(&core_id) {
            return Err(FieldError::new(
                format!("{path}.components"),
                core_id,
                "core parameter is missing",
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_state(value: serde_json::Value) -> RawUiState {
        serde_json::from_value(value).unwrap()
    }

    fn core_components() -> serde_json::Value {
        json!([
            {"id": "altitude", "visible": true, "zone": "primary", "order": 1},
            {"id": "airspeed", "visible": true, "zone": "primary", "order": 2},
            {"id": "rpm", "visible": true, "zone": "primary", "order": 3},
            {"id": "phase", "visible": true, "zone": "primary", "order": 4}
        ])
    }

    #[test]
    fn fills_label_scale_style_and_core_flag_from_catalog() {
        let raw = raw_state(json!({"theme": "dark", "components": core_components()}));
        let state = build_ui_state(&raw, "current_ui", &ComponentCatalog::standard()).unwrap();

        let altitude = state.component(ComponentId::Altitude).unwrap();
        assert_eq!(altitude.label, "Altitude (ft)");
        assert!(altitude.is_core);
        assert_eq!(altitude.scale, DEFAULT_SCALE);
        assert_eq!(altitude.visualization_type, VisualizationType::Text);
    }

    #[test]
    fn empty_label_falls_back_to_catalog() {
        let raw = RawComponent {
            id: "fuel".to_string(),
            label: Some(String::new()),
            visible: Some(false),
            zone: Some("secondary".to_string()),
            order: Some(7),
            ..Default::default()
        };
        let component = build_component(&raw, "c", &ComponentCatalog::standard()).unwrap();
        assert_eq!(component.label, "Fuel Level (%)");
        assert!(!component.is_core);
    }

    #[test]
    fn rejects_unknown_enum_values() {
        let catalog = ComponentCatalog::standard();
        let unknown_id = RawComponent { id: "oil".to_string(), ..Default::default() };
        let err = build_component_patch(&unknown_id, "c", &catalog).unwrap_err();
        assert_eq!(err.field, "c.id");
        assert_eq!(err.value, "oil");

        let bad_zone = RawComponent {
            id: "fuel".to_string(),
            zone: Some("middle".to_string()),
            ..Default::default()
        };
        assert_eq!(build_component_patch(&bad_zone, "c", &catalog).unwrap_err().field, "c.zone");

        let bad_kind = RawComponent {
            id: "fuel".to_string(),
            visualization_type: Some("pie".to_string()),
            ..Default::default()
        };
        assert_eq!(
            build_component_patch(&bad_kind, "c", &catalog).unwrap_err().field,
            "c.visualizationType"
        );

        let raw = raw_state(json!({"theme": "sepia", "components": core_components()}));
        assert_eq!(build_ui_state(&raw, "s", &catalog).unwrap_err().field, "s.theme");
    }

    #[test]
    fn rejects_scale_outside_range_instead_of_clamping() {
        let catalog = ComponentCatalog::standard();
        for scale in [0.49, 2.01, f64::NAN] {
            let raw = RawComponent {
                id: "fuel".to_string(),
                scale: Some(scale),
                ..Default::default()
            };
            let err = build_component_patch(&raw, "c", &catalog).unwrap_err();
            assert_eq!(err.field, "c.scale");
        }
        let edge = RawComponent { id: "fuel".to_string(), scale: Some(2.0), ..Default::default() };
        assert!(build_component_patch(&edge, "c", &catalog).is_ok());
    }

    #[test]
    fn core_component_cannot_be_hidden_or_moved() {
        let catalog = ComponentCatalog::standard();
        let hidden = RawComponent {
            id: "altitude".to_string(),
            visible: Some(false),
            ..Default::default()
        };
        let err = build_component_patch(&hidden, "c", &catalog).unwrap_err();
        assert_eq!(err.field, "c.visible");

        let moved = RawComponent {
            id: "rpm".to_string(),
            zone: Some("secondary".to_string()),
            ..Default::default()
        };
        let err = build_component_patch(&moved, "c", &catalog).unwrap_err();
        assert_eq!(err.field, "c.zone");
    }

    #[test]
    fn is_core_must_agree_with_catalog() {
        let catalog = ComponentCatalog::standard();
        let demoted = RawComponent {
            id: "phase".to_string(),
            is_core: Some(false),
            ..Default::default()
        };
        assert_eq!(build_component_patch(&demoted, "c", &catalog).unwrap_err().field, "c.isCore");

        let promoted = RawComponent {
            id: "heading".to_string(),
            is_core: Some(true),
            ..Default::default()
        };
        assert_eq!(build_component_patch(&promoted, "c", &catalog).unwrap_err().field, "c.isCore");
    }

    #[test]
    fn full_state_requires_every_core_id() {
        let raw = raw_state(json!({
            "theme": "light",
            "components": [
                {"id": "altitude", "visible": true, "zone": "primary", "order": 1},
                {"id": "airspeed", "visible": true, "zone": "primary", "order": 2},
                {"id": "rpm", "visible": true, "zone": "primary", "order": 3}
            ]
        }));
        let err = build_ui_state(&raw, "s", &ComponentCatalog::standard()).unwrap_err();
        assert_eq!(err.field, "s.components");
        assert_eq!(err.value, "phase");
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let raw = raw_state(json!({
            "components": [
                {"id": "fuel", "zone": "secondary"},
                {"id": "fuel", "visible": false}
            ]
        }));
        let err = build_proposed_state(&raw, "updatedConfig", &ComponentCatalog::standard()).unwrap_err();
        assert_eq!(err.field, "updatedConfig.components[1].id");
    }

    #[test]
    fn proposal_may_omit_theme_and_fields() {
        let raw = raw_state(json!({"components": [{"id": "fuel", "zone": "secondary"}]}));
        let proposal = build_proposed_state(&raw, "updatedConfig", &ComponentCatalog::standard()).unwrap();
        assert_eq!(proposal.theme, None);
        assert_eq!(proposal.components[0].zone, Some(Zone::Secondary));
        assert_eq!(proposal.components[0].visible, None);
    }

    #[test]
    fn explicit_null_style_differs_from_absent() {
        let raw = raw_state(json!({"components": [
            {"id": "fuel", "color": null, "bgColor": "#000000"},
            {"id": "heading"}
        ]}));
        let proposal = build_proposed_state(&raw, "updatedConfig", &ComponentCatalog::standard()).unwrap();
        assert_eq!(proposal.components[0].color, Some(None));
        assert_eq!(proposal.components[0].bg_color, Some(Some("#000000".to_string())));
        assert_eq!(proposal.components[1].color, None);
    }

    #[test]
    fn long_values_are_cut_to_an_excerpt() {
        let raw = RawComponent { id: "x".repeat(5000), ..Default::default() };
        let err = build_component_patch(&raw, "c", &ComponentCatalog::standard()).unwrap_err();
        assert_eq!(err.value.chars().count(), VALUE_EXCERPT_CHARS + 3);
        assert!(err.value.ends_with("..."));
        assert!(err.to_string().len() < 300);
    }

    #[test]
    fn completing_a_patch_requires_layout_fields() {
        let patch = ComponentPatch::new(ComponentId::Heading);
        let err = complete_component(&patch, "p", &ComponentCatalog::standard()).unwrap_err();
        assert_eq!(err.field, "p.visible");
    }
}
