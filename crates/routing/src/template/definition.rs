//! Stage template value types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::TemplateError;

/// Classification label describing which stages an order's fulfillment needs.
///
/// Path types are data: the catalog may introduce new ones without code
/// changes, so this is an open string rather than an enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessPathType(String);

impl ProcessPathType {
    /// Picker brings items straight to the packer.
    pub const PICK_PACK: &'static str = "pick_pack";
    /// Picked items are sorted on a put wall before packing.
    pub const PICK_WALL_PACK: &'static str = "pick_wall_pack";
    /// Picks from several zones are merged before packing.
    pub const PICK_CONSOLIDATE_PACK: &'static str = "pick_consolidate_pack";
    /// Consolidated picks are gift wrapped, packed and handed to shipping.
    pub const PICK_GIFT_WRAP_PACK: &'static str = "pick_gift_wrap_pack";

    /// Creates a path type from its token.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn pick_pack() -> Self {
        Self::new(Self::PICK_PACK)
    }

    pub fn pick_wall_pack() -> Self {
        Self::new(Self::PICK_WALL_PACK)
    }

    pub fn pick_consolidate_pack() -> Self {
        Self::new(Self::PICK_CONSOLIDATE_PACK)
    }

    pub fn pick_gift_wrap_pack() -> Self {
        Self::new(Self::PICK_GIFT_WRAP_PACK)
    }

    /// Returns the token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProcessPathType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProcessPathType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProcessPathType {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The kind of work a stage represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Picking,
    Walling,
    Consolidation,
    GiftWrap,
    Packing,
    Shipping,
}

impl StageKind {
    /// Returns the wire name of the stage kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Picking => "picking",
            StageKind::Walling => "walling",
            StageKind::Consolidation => "consolidation",
            StageKind::GiftWrap => "gift_wrap",
            StageKind::Packing => "packing",
            StageKind::Shipping => "shipping",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage-specific station settings handed to the executing service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageConfig {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub requires_put_wall: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put_wall_zone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_id: Option<String>,
}

/// One step of a stage template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDefinition {
    /// 1-based position within the template.
    pub order: u32,

    pub stage_type: StageKind,

    /// Tag used to route the work to the service that executes it.
    pub task_type: String,

    pub required: bool,

    pub timeout_mins: u32,

    #[serde(default)]
    pub config: StageConfig,
}

impl StageDefinition {
    /// Creates a required stage whose task type is the stage kind's name.
    pub fn new(order: u32, stage_type: StageKind, timeout_mins: u32) -> Self {
        Self {
            order,
            stage_type,
            task_type: stage_type.as_str().to_string(),
            required: true,
            timeout_mins,
            config: StageConfig::default(),
        }
    }

    /// Replaces the station settings.
    pub fn with_config(mut self, config: StageConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns how long a worker may take before the stage is considered stuck.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.timeout_mins) * 60)
    }
}

/// The matching rule a template advertises to the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u32>,

    /// None means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u32>,

    /// Higher wins when several templates accept the same order.
    #[serde(default)]
    pub priority: i32,
}

impl SelectionCriteria {
    /// Creates criteria with the given priority and no item bounds.
    pub fn with_priority(priority: i32) -> Self {
        Self {
            priority,
            ..Default::default()
        }
    }

    /// Sets the minimum item count.
    pub fn min_items(mut self, min_items: u32) -> Self {
        self.min_items = Some(min_items);
        self
    }

    /// Sets the maximum item count.
    pub fn max_items(mut self, max_items: u32) -> Self {
        self.max_items = Some(max_items);
        self
    }

    /// Returns true if an order with `item_count` items satisfies the criteria.
    pub fn accepts(&self, item_count: u32) -> bool {
        self.min_items.is_none_or(|min| item_count >= min)
            && self.max_items.is_none_or(|max| item_count <= max)
    }
}

/// An ordered stage sequence keyed by process-path type.
///
/// Templates are immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTemplate {
    pub template_id: String,

    pub path_type: ProcessPathType,

    pub name: String,

    #[serde(default)]
    pub description: String,

    pub stages: Vec<StageDefinition>,

    #[serde(default)]
    pub selection_criteria: SelectionCriteria,

    #[serde(default)]
    pub is_default: bool,
}

impl StageTemplate {
    /// Creates a template.
    pub fn new(
        template_id: impl Into<String>,
        path_type: ProcessPathType,
        name: impl Into<String>,
        description: impl Into<String>,
        stages: Vec<StageDefinition>,
        selection_criteria: SelectionCriteria,
    ) -> Self {
        Self {
            template_id: template_id.into(),
            path_type,
            name: name.into(),
            description: description.into(),
            stages,
            selection_criteria,
            is_default: false,
        }
    }

    /// Marks the template as the default for its catalog.
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Returns the number of stages.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns the first stage definition of the given kind.
    pub fn stage(&self, kind: StageKind) -> Option<&StageDefinition> {
        self.stages.iter().find(|s| s.stage_type == kind)
    }

    /// Returns true if the template contains a stage of the given kind.
    pub fn has_stage(&self, kind: StageKind) -> bool {
        self.stage(kind).is_some()
    }

    /// Checks the template is internally consistent.
    ///
    /// Stage ordinals must run 1, 2, .., N in list order and item bounds
    /// must not be inverted.
    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.template_id.trim().is_empty() {
            return Err(TemplateError::MissingTemplateId);
        }

        if self.stages.is_empty() {
            return Err(TemplateError::NoStages {
                template_id: self.template_id.clone(),
            });
        }

        for (index, stage) in self.stages.iter().enumerate() {
            let expected = index as u32 + 1;
            if stage.order != expected {
                return Err(TemplateError::NonContiguousStages {
                    template_id: self.template_id.clone(),
                    expected,
                    found: stage.order,
                });
            }
        }

        if let (Some(min), Some(max)) = (
            self.selection_criteria.min_items,
            self.selection_criteria.max_items,
        ) && min > max
        {
            return Err(TemplateError::InvertedItemBounds {
                template_id: self.template_id.clone(),
                min,
                max,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_stage(template_id: &str) -> StageTemplate {
        StageTemplate::new(
            template_id,
            ProcessPathType::pick_pack(),
            "Test",
            "",
            vec![
                StageDefinition::new(1, StageKind::Picking, 30),
                StageDefinition::new(2, StageKind::Packing, 15),
            ],
            SelectionCriteria::with_priority(1),
        )
    }

    #[test]
    fn criteria_bounds_are_inclusive() {
        let criteria = SelectionCriteria::with_priority(1).min_items(4).max_items(10);

        assert!(!criteria.accepts(3));
        assert!(criteria.accepts(4));
        assert!(criteria.accepts(7));
        assert!(criteria.accepts(10));
        assert!(!criteria.accepts(11));
    }

    #[test]
    fn criteria_without_bounds_accepts_everything() {
        let criteria = SelectionCriteria::default();
        assert!(criteria.accepts(0));
        assert!(criteria.accepts(u32::MAX));
    }

    #[test]
    fn valid_template_passes() {
        assert!(two_stage("tpl-1").validate().is_ok());
    }

    #[test]
    fn gap_in_ordinals_is_rejected() {
        let mut template = two_stage("tpl-1");
        template.stages[1].order = 3;

        assert!(matches!(
            template.validate(),
            Err(TemplateError::NonContiguousStages {
                expected: 2,
                found: 3,
                ..
            })
        ));
    }

    #[test]
    fn ordinals_must_start_at_one() {
        let mut template = two_stage("tpl-1");
        template.stages[0].order = 0;
        template.stages[1].order = 1;

        assert!(matches!(
            template.validate(),
            Err(TemplateError::NonContiguousStages { expected: 1, .. })
        ));
    }

    #[test]
    fn empty_template_is_rejected() {
        let mut template = two_stage("tpl-1");
        template.stages.clear();
        assert!(matches!(
            template.validate(),
            Err(TemplateError::NoStages { .. })
        ));
    }

    #[test]
    fn blank_id_is_rejected() {
        assert!(matches!(
            two_stage("  ").validate(),
            Err(TemplateError::MissingTemplateId)
        ));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let mut template = two_stage("tpl-1");
        template.selection_criteria = SelectionCriteria::with_priority(1).min_items(5).max_items(2);
        assert!(matches!(
            template.validate(),
            Err(TemplateError::InvertedItemBounds { min: 5, max: 2, .. })
        ));
    }

    #[test]
    fn has_stage_lookup() {
        let template = two_stage("tpl-1");
        assert!(template.has_stage(StageKind::Packing));
        assert!(!template.has_stage(StageKind::Walling));
        assert_eq!(template.stage(StageKind::Picking).unwrap().task_type, "picking");
    }

    #[test]
    fn stage_timeout_converts_minutes() {
        let stage = StageDefinition::new(1, StageKind::Picking, 30);
        assert_eq!(stage.timeout(), Duration::from_secs(1800));
    }

    #[test]
    fn template_json_uses_camel_case() {
        let json = serde_json::to_value(two_stage("tpl-1")).unwrap();
        assert_eq!(json["templateId"], "tpl-1");
        assert_eq!(json["pathType"], "pick_pack");
        assert_eq!(json["stages"][0]["stageType"], "picking");
        assert_eq!(json["stages"][0]["timeoutMins"], 30);
        assert_eq!(json["selectionCriteria"]["priority"], 1);
        assert!(json["selectionCriteria"].get("maxItems").is_none());
    }

    #[test]
    fn stage_kind_wire_names_match_serde() {
        for kind in [
            StageKind::Picking,
            StageKind::Walling,
            StageKind::Consolidation,
            StageKind::GiftWrap,
            StageKind::Packing,
            StageKind::Shipping,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
