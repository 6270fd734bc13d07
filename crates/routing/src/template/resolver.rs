use std::sync::Arc;

use common::{OrderId, WaveId};
use serde::{Deserialize, Serialize};

use super::{ProcessPathType, StageDefinition, StageTemplate, TemplateError, TemplateRegistry};
use crate::error::DomainError;
use crate::route::TaskRoute;

/// Everything the resolver needs to build a route for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub order_id: OrderId,
    pub wave_id: WaveId,
    pub path_type: ProcessPathType,
    pub item_count: u32,

    #[serde(default)]
    pub special_handling: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_path_id: Option<String>,
}

impl ResolveRequest {
    /// Creates a request without special handling or a decision ID.
    pub fn new(
        order_id: impl Into<OrderId>,
        wave_id: impl Into<WaveId>,
        path_type: impl Into<ProcessPathType>,
        item_count: u32,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            wave_id: wave_id.into(),
            path_type: path_type.into(),
            item_count,
            special_handling: Vec::new(),
            process_path_id: None,
        }
    }

    /// Sets the special-handling tags.
    pub fn with_special_handling(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.special_handling = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the process-path decision ID.
    pub fn with_process_path_id(mut self, process_path_id: impl Into<String>) -> Self {
        self.process_path_id = Some(process_path_id.into());
        self
    }
}

/// Template selection input for an execution plan.
///
/// The classification details are not used for selection; they are echoed
/// into the plan so the caller can hand them on with the route request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub path_type: ProcessPathType,
    pub item_count: u32,

    #[serde(default)]
    pub special_handling: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_path_id: Option<String>,

    /// Station picked by process-path classification, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_station_id: Option<String>,
}

impl PlanRequest {
    pub fn new(path_type: impl Into<ProcessPathType>, item_count: u32) -> Self {
        Self {
            path_type: path_type.into(),
            item_count,
            special_handling: Vec::new(),
            process_path_id: None,
            target_station_id: None,
        }
    }

    /// Sets the special-handling tags.
    pub fn with_special_handling(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.special_handling = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the process-path decision ID.
    pub fn with_process_path_id(mut self, process_path_id: impl Into<String>) -> Self {
        self.process_path_id = Some(process_path_id.into());
        self
    }

    pub fn with_target_station_id(mut self, station_id: impl Into<String>) -> Self {
        self.target_station_id = Some(station_id.into());
        self
    }
}

/// The template selected for an order, without a route built from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlan {
    pub template_id: String,
    pub template_name: String,
    pub path_type: ProcessPathType,
    pub item_count: u32,
    pub stages: Vec<StageDefinition>,

    #[serde(default)]
    pub special_handling: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_path_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_station_id: Option<String>,
}

impl ExecutionPlan {
    fn from_template(template: &StageTemplate, request: &PlanRequest) -> Self {
        Self {
            template_id: template.template_id.clone(),
            template_name: template.name.clone(),
            path_type: template.path_type.clone(),
            item_count: request.item_count,
            stages: template.stages.clone(),
            special_handling: request.special_handling.clone(),
            process_path_id: request.process_path_id.clone(),
            target_station_id: request.target_station_id.clone(),
        }
    }
}

/// Selects templates and builds task routes from them.
#[derive(Debug, Clone)]
pub struct RouteResolver {
    registry: Arc<TemplateRegistry>,
}

impl RouteResolver {
    pub fn new(registry: Arc<TemplateRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the registry the resolver selects from.
    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Returns the template an order would be routed through.
    pub fn plan(&self, request: &PlanRequest) -> Result<ExecutionPlan, TemplateError> {
        let template = self
            .registry
            .select(&request.path_type, request.item_count)?;
        Ok(ExecutionPlan::from_template(template, request))
    }

    /// Selects a template for the request and builds a pending route from it.
    ///
    /// The returned route holds its `RouteCreated` event and has not been
    /// persisted.
    pub fn resolve(&self, request: &ResolveRequest) -> Result<TaskRoute, DomainError> {
        let template = self
            .registry
            .select(&request.path_type, request.item_count)?;

        tracing::debug!(
            order_id = %request.order_id,
            template_id = %template.template_id,
            item_count = request.item_count,
            "Selected stage template"
        );

        let route = TaskRoute::new(
            request.order_id.clone(),
            request.wave_id.clone(),
            template,
            request.special_handling.clone(),
            request.process_path_id.clone(),
        )?;
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregate;
    use crate::route::{RouteError, RouteStatus};
    use crate::template::StageKind;

    fn resolver() -> RouteResolver {
        RouteResolver::new(Arc::new(TemplateRegistry::with_defaults()))
    }

    #[test]
    fn test_plan_for_medium_order_uses_put_wall() {
        let plan = resolver()
            .plan(&PlanRequest::new(ProcessPathType::pick_wall_pack(), 12))
            .unwrap();

        assert_eq!(plan.template_id, "tpl-pick-wall-pack");
        assert_eq!(plan.item_count, 12);
        assert!(plan.special_handling.is_empty());
        assert!(plan.process_path_id.is_none());
        let kinds: Vec<_> = plan.stages.iter().map(|s| s.stage_type).collect();
        assert_eq!(
            kinds,
            vec![StageKind::Picking, StageKind::Walling, StageKind::Packing]
        );
    }

    #[test]
    fn test_plan_rejects_order_outside_criteria() {
        let result = resolver().plan(&PlanRequest::new(ProcessPathType::pick_pack(), 4));
        assert!(matches!(
            result,
            Err(TemplateError::NoMatchingTemplate { item_count: 4, .. })
        ));
    }

    #[test]
    fn test_plan_echoes_classification() {
        let request = PlanRequest::new(ProcessPathType::pick_gift_wrap_pack(), 3)
            .with_special_handling(["gift_wrap", "fragile_packing"])
            .with_process_path_id("PP-42")
            .with_target_station_id("GW-STATION-2");

        let plan = resolver().plan(&request).unwrap();

        assert_eq!(plan.template_id, "tpl-pick-gift-wrap-pack");
        assert_eq!(
            plan.special_handling,
            vec!["gift_wrap".to_string(), "fragile_packing".to_string()]
        );
        assert_eq!(plan.process_path_id.as_deref(), Some("PP-42"));
        assert_eq!(plan.target_station_id.as_deref(), Some("GW-STATION-2"));

        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["processPathId"], "PP-42");
        assert_eq!(json["targetStationId"], "GW-STATION-2");
    }

    #[test]
    fn test_resolve_builds_pending_route() {
        let request = ResolveRequest::new("ORD-1", "WAVE-7", ProcessPathType::pick_pack(), 2)
            .with_special_handling(["fragile_packing"])
            .with_process_path_id("PP-1");

        let route = resolver().resolve(&request).unwrap();

        assert_eq!(route.template_id(), "tpl-pick-pack");
        assert_eq!(route.order_id().as_str(), "ORD-1");
        assert_eq!(route.wave_id().as_str(), "WAVE-7");
        assert_eq!(route.status(), RouteStatus::Pending);
        assert_eq!(route.stages().len(), 2);
        assert_eq!(route.special_handling(), ["fragile_packing".to_string()]);
        assert_eq!(route.process_path_id(), Some("PP-1"));
        assert_eq!(route.pending_events().len(), 1);
    }

    #[test]
    fn test_resolve_gift_wrap_route() {
        let request =
            ResolveRequest::new("ORD-2", "WAVE-1", ProcessPathType::pick_gift_wrap_pack(), 6);
        let route = resolver().resolve(&request).unwrap();

        assert_eq!(route.stages().len(), 5);
        assert_eq!(route.stages()[2].stage_type, StageKind::GiftWrap);
    }

    #[test]
    fn test_resolve_without_match_fails() {
        let request = ResolveRequest::new("ORD-1", "WAVE-1", "pick_unknown_pack", 1);
        assert!(matches!(
            resolver().resolve(&request),
            Err(DomainError::Template(TemplateError::NoMatchingTemplate { .. }))
        ));
    }

    #[test]
    fn test_resolve_rejects_blank_order() {
        let request = ResolveRequest::new("", "WAVE-1", ProcessPathType::pick_pack(), 1);
        assert!(matches!(
            resolver().resolve(&request),
            Err(DomainError::Route(RouteError::MissingOrderId))
        ));
    }

    #[test]
    fn test_request_json_shape() {
        let request: ResolveRequest = serde_json::from_value(serde_json::json!({
            "orderId": "ORD-1",
            "waveId": "WAVE-1",
            "pathType": "pick_pack",
            "itemCount": 3
        }))
        .unwrap();

        assert!(request.special_handling.is_empty());
        assert!(request.process_path_id.is_none());
    }
}
