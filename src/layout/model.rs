use std::fmt;
use std::ops::RangeInclusive;

use serde::Serialize;

pub const DEFAULT_SCALE: f64 = 1.0;
pub const SCALE_RANGE: RangeInclusive<f64> = 0.5..=2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentId {
    Altitude,
    Airspeed,
    Rpm,
    Phase,
    Fuel,
    Temperature,
    Pressure,
    Heading,
    VerticalSpeed,
}

impl ComponentId {
    pub const ALL: [ComponentId; 9] = [
        ComponentId::Altitude,
        ComponentId::Airspeed,
        ComponentId::Rpm,
        ComponentId::Phase,
        ComponentId::Fuel,
        ComponentId::Temperature,
        ComponentId::Pressure,
        ComponentId::Heading,
        ComponentId::VerticalSpeed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ComponentId::Altitude => "altitude",
            ComponentId::Airspeed => "airspeed",
            ComponentId::Rpm => "rpm",
            ComponentId::Phase => "phase",
            ComponentId::Fuel => "fuel",
            ComponentId::Temperature => "temperature",
            ComponentId::Pressure => "pressure",
            ComponentId::Heading => "heading",
            ComponentId::VerticalSpeed => "vertical_speed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == value)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layout region: `primary` is the top half of the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Primary,
    Secondary,
}

impl Zone {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "primary" => Some(Zone::Primary),
            "secondary" => Some(Zone::Secondary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "dark" => Some(Theme::Dark),
            "light" => Some(Theme::Light),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationType {
    #[default]
    Text,
    Bar,
    Ring,
}

impl VisualizationType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(VisualizationType::Text),
            "bar" => Some(VisualizationType::Bar),
            "ring" => Some(VisualizationType::Ring),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentMeta {
    pub id: ComponentId,
    pub label: &'static str,
    pub is_core: bool,
}

const STANDARD_COMPONENTS: &[ComponentMeta] = &[
    ComponentMeta { id: ComponentId::Altitude, label: "Altitude (ft)", is_core: true },
    ComponentMeta { id: ComponentId::Airspeed, label: "Airspeed (mph)", is_core: true },
    ComponentMeta { id: ComponentId::Rpm, label: "Engine RPM", is_core: true },
    ComponentMeta { id: ComponentId::Phase, label: "Flight Phase", is_core: true },
    ComponentMeta { id: ComponentId::Fuel, label: "Fuel Level (%)", is_core: false },
    ComponentMeta { id: ComponentId::Temperature, label: "Temperature (°C)", is_core: false },
    ComponentMeta { id: ComponentId::Pressure, label: "Pressure (hPa)", is_core: false },
    ComponentMeta { id: ComponentId::Heading, label: "Heading (°)", is_core: false },
    ComponentMeta { id: ComponentId::VerticalSpeed, label: "Vertical Speed (ft/min)", is_core: false },
];

/// Static id -> label/core metadata. Every normalization step takes the
/// catalog explicitly instead of reaching for a global.
#[derive(Debug, Clone, Copy)]
pub struct ComponentCatalog {
    entries: &'static [ComponentMeta],
}

impl ComponentCatalog {
    pub const fn new(entries: &'static [ComponentMeta]) -> Self {
        Self { entries }
    }

    pub const fn standard() -> Self {
        Self::new(STANDARD_COMPONENTS)
    }

    pub fn get(&self, id: ComponentId) -> Option<&ComponentMeta> {
        self.entries.iter().find(|meta| meta.id == id)
    }

    pub fn label(&self, id: ComponentId) -> &'static str {
        self.get(id).map(|meta| meta.label).unwrap_or(id.as_str())
    }

    pub fn is_core(&self, id: ComponentId) -> bool {
        self.get(id).map(|meta| meta.is_core).unwrap_or(false)
    }

    pub fn core_ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.entries.iter().filter(|meta| meta.is_core).map(|meta| meta.id)
    }
}

impl Default for ComponentCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentConfig {
    pub id: ComponentId,
    pub label: String,
    pub visible: bool,
    pub zone: Zone,
    pub order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<String>,
    pub scale: f64,
    pub is_core: bool,
    pub visualization_type: VisualizationType,
}

impl ComponentConfig {
    /// Applies every field the patch sets on top of this component.
    pub fn overlay(&self, patch: &ComponentPatch) -> ComponentConfig {
        ComponentConfig {
            id: self.id,
            label: patch.label.clone().unwrap_or_else(|| self.label.clone()),
            visible: patch.visible.unwrap_or(self.visible),
            zone: patch.zone.unwrap_or(self.zone),
            order: patch.order.unwrap_or(self.order),
            color: patch.color.clone().unwrap_or_else(|| self.color.clone()),
            bg_color: patch.bg_color.clone().unwrap_or_else(|| self.bg_color.clone()),
            scale: patch.scale.unwrap_or(self.scale),
            is_core: patch.is_core.unwrap_or(self.is_core),
            visualization_type: patch.visualization_type.unwrap_or(self.visualization_type),
        }
    }
}

/// A component as proposed by the model: only the fields it chose to set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentPatch {
    pub id: ComponentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<Zone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    /// `Some(None)` clears the prior style.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_core: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualization_type: Option<VisualizationType>,
}

impl ComponentPatch {
    pub fn new(id: ComponentId) -> Self {
        Self {
            id,
            label: None,
            visible: None,
            zone: None,
            order: None,
            color: None,
            bg_color: None,
            scale: None,
            is_core: None,
            visualization_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiState {
    pub theme: Theme,
    pub components: Vec<ComponentConfig>,
}

impl UiState {
    pub fn component(&self, id: ComponentId) -> Option<&ComponentConfig> {
        self.components.iter().find(|component| component.id == id)
    }
}

/// The `updatedConfig` a model proposes; theme and component fields may be omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposedUiState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    pub components: Vec<ComponentPatch>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentResult {
    pub success: bool,
    pub message: Option<String>,
    pub updated_config: Option<ProposedUiState>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fuel() -> ComponentConfig {
        ComponentConfig {
            id: ComponentId::Fuel,
            label: "Fuel Level (%)".to_string(),
            visible: true,
            zone: Zone::Primary,
            order: 5,
            color: Some("#00ff00".to_string()),
            bg_color: None,
            scale: 1.5,
            is_core: false,
            visualization_type: VisualizationType::Bar,
        }
    }

    #[test]
    fn component_ids_round_trip_through_their_names() {
        for id in ComponentId::ALL {
            assert_eq!(ComponentId::parse(id.as_str()), Some(id));
        }
        assert_eq!(ComponentId::parse("vertical_speed"), Some(ComponentId::VerticalSpeed));
        assert_eq!(ComponentId::parse("Altitude"), None);
        assert_eq!(ComponentId::parse("oil"), None);
    }

    #[test]
    fn standard_catalog_marks_the_four_core_ids() {
        let catalog = ComponentCatalog::standard();
        let core: Vec<_> = catalog.core_ids().collect();
        assert_eq!(
            core,
            vec![ComponentId::Altitude, ComponentId::Airspeed, ComponentId::Rpm, ComponentId::Phase]
        );
        assert!(!catalog.is_core(ComponentId::Fuel));
        assert_eq!(catalog.label(ComponentId::Rpm), "Engine RPM");
    }

    #[test]
    fn overlay_keeps_fields_the_patch_leaves_unset() {
        let mut patch = ComponentPatch::new(ComponentId::Fuel);
        patch.zone = Some(Zone::Secondary);
        patch.order = Some(10);

        let merged = fuel().overlay(&patch);
        assert_eq!(merged.zone, Zone::Secondary);
        assert_eq!(merged.order, 10);
        assert_eq!(merged.color.as_deref(), Some("#00ff00"));
        assert_eq!(merged.scale, 1.5);
        assert_eq!(merged.visualization_type, VisualizationType::Bar);
        assert_eq!(merged.label, "Fuel Level (%)");
    }

    #[test]
    fn component_serializes_with_camel_case_names() {
        let value = serde_json::to_value(fuel()).unwrap();
        assert_eq!(value["id"], "fuel");
        assert_eq!(value["isCore"], false);
        assert_eq!(value["visualizationType"], "bar");
        assert!(value.get("bgColor").is_none());
    }
}
