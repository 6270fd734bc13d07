//! Built-in template catalog and JSON catalog loading.

use std::path::Path;

use super::{
    ProcessPathType, SelectionCriteria, StageConfig, StageDefinition, StageKind, StageTemplate,
    TemplateError,
};

/// Returns the built-in templates in registration order.
pub fn default_templates() -> Vec<StageTemplate> {
    vec![
        pick_pack(),
        pick_wall_pack(),
        pick_consolidate_pack(),
        pick_gift_wrap_pack(),
    ]
}

fn pick_pack() -> StageTemplate {
    StageTemplate::new(
        "tpl-pick-pack",
        ProcessPathType::pick_pack(),
        "Direct Pick to Pack",
        "Small orders: the picker brings items directly to the packer",
        vec![
            StageDefinition::new(1, StageKind::Picking, 30),
            StageDefinition::new(2, StageKind::Packing, 15),
        ],
        SelectionCriteria::with_priority(1).max_items(3),
    )
    .as_default()
}

fn pick_wall_pack() -> StageTemplate {
    StageTemplate::new(
        "tpl-pick-wall-pack",
        ProcessPathType::pick_wall_pack(),
        "Pick Wall Pack",
        "Medium orders: picked items are sorted on a put wall before packing",
        vec![
            StageDefinition::new(1, StageKind::Picking, 30),
            StageDefinition::new(2, StageKind::Walling, 10).with_config(StageConfig {
                requires_put_wall: true,
                ..Default::default()
            }),
            StageDefinition::new(3, StageKind::Packing, 15),
        ],
        SelectionCriteria::with_priority(2).min_items(4).max_items(20),
    )
}

fn pick_consolidate_pack() -> StageTemplate {
    StageTemplate::new(
        "tpl-pick-consolidate-pack",
        ProcessPathType::pick_consolidate_pack(),
        "Multi-Zone Consolidation",
        "Orders spanning several zones: picks are merged before packing",
        vec![
            StageDefinition::new(1, StageKind::Picking, 30),
            StageDefinition::new(2, StageKind::Consolidation, 20),
            StageDefinition::new(3, StageKind::Packing, 15),
        ],
        SelectionCriteria::with_priority(3),
    )
}

fn pick_gift_wrap_pack() -> StageTemplate {
    StageTemplate::new(
        "tpl-pick-gift-wrap-pack",
        ProcessPathType::pick_gift_wrap_pack(),
        "Gift Wrap",
        "Gift orders: consolidated picks are wrapped, packed and handed to shipping",
        vec![
            StageDefinition::new(1, StageKind::Picking, 30),
            StageDefinition::new(2, StageKind::Consolidation, 20),
            StageDefinition::new(3, StageKind::GiftWrap, 20),
            StageDefinition::new(4, StageKind::Packing, 15),
            StageDefinition::new(5, StageKind::Shipping, 30),
        ],
        SelectionCriteria::with_priority(1),
    )
}

/// Parses a JSON array of templates.
///
/// Templates are only deserialized here; validation happens on registration.
pub fn parse_catalog(json: &str) -> Result<Vec<StageTemplate>, TemplateError> {
    Ok(serde_json::from_str(json)?)
}

/// Reads and parses a catalog file.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Vec<StageTemplate>, TemplateError> {
    let json = std::fs::read_to_string(path)?;
    parse_catalog(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_templates_are_valid() {
        for template in default_templates() {
            assert!(template.validate().is_ok(), "{}", template.template_id);
        }
    }

    #[test]
    fn only_pick_pack_is_default() {
        let defaults: Vec<_> = default_templates()
            .into_iter()
            .filter(|t| t.is_default)
            .map(|t| t.template_id)
            .collect();
        assert_eq!(defaults, vec!["tpl-pick-pack".to_string()]);
    }

    #[test]
    fn walling_stage_requires_put_wall() {
        let template = pick_wall_pack();
        let walling = template.stage(StageKind::Walling).unwrap();
        assert!(walling.config.requires_put_wall);
    }

    #[test]
    fn gift_wrap_template_has_five_stages() {
        let template = pick_gift_wrap_pack();
        assert_eq!(template.stage_count(), 5);
        assert_eq!(template.stages[2].stage_type, StageKind::GiftWrap);
        assert_eq!(template.stages[4].stage_type, StageKind::Shipping);
    }

    #[test]
    fn parse_catalog_reads_camel_case() {
        let json = r#"[
            {
                "templateId": "tpl-express",
                "pathType": "pick_pack",
                "name": "Express",
                "stages": [
                    {"order": 1, "stageType": "picking", "taskType": "picking", "required": true, "timeoutMins": 10},
                    {"order": 2, "stageType": "packing", "taskType": "packing", "required": true, "timeoutMins": 5,
                     "config": {"stationId": "PACK-07"}}
                ],
                "selectionCriteria": {"maxItems": 2, "priority": 5}
            }
        ]"#;

        let templates = parse_catalog(json).unwrap();
        assert_eq!(templates.len(), 1);

        let template = &templates[0];
        assert_eq!(template.path_type, ProcessPathType::pick_pack());
        assert_eq!(template.selection_criteria.max_items, Some(2));
        assert_eq!(template.selection_criteria.min_items, None);
        assert_eq!(
            template.stages[1].config.station_id.as_deref(),
            Some("PACK-07")
        );
        assert!(!template.is_default);
    }

    #[test]
    fn parse_catalog_rejects_unknown_stage_kind() {
        let json = r#"[
            {
                "templateId": "tpl-labeled",
                "pathType": "pick_pack",
                "name": "Labeled",
                "stages": [
                    {"order": 1, "stageType": "labeling", "taskType": "labeling", "required": true, "timeoutMins": 5}
                ],
                "selectionCriteria": {"priority": 1}
            }
        ]"#;

        match parse_catalog(json) {
            Err(TemplateError::CatalogFormat(e)) => {
                assert!(e.to_string().contains("labeling"), "{e}");
            }
            other => panic!("expected a catalog format error, got {other:?}"),
        }
    }

    #[test]
    fn parse_catalog_rejects_garbage() {
        assert!(matches!(
            parse_catalog("{not json"),
            Err(TemplateError::CatalogFormat(_))
        ));
    }

    #[test]
    fn load_catalog_reports_missing_file() {
        assert!(matches!(
            load_catalog("/nonexistent/catalog.json"),
            Err(TemplateError::CatalogIo(_))
        ));
    }
}
