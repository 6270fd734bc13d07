use super::{ProcessPathType, StageTemplate, TemplateError, catalog::default_templates};

/// Catalog of stage templates, kept in registration order.
///
/// The registry is built explicitly at startup and handed to the resolver.
/// Registration order is significant: it breaks priority ties.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: Vec<StageTemplate>,
}

impl TemplateRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in templates.
    pub fn with_defaults() -> Self {
        Self {
            templates: default_templates(),
        }
    }

    /// Creates a registry from a template list, registering in list order.
    pub fn from_templates(
        templates: impl IntoIterator<Item = StageTemplate>,
    ) -> Result<Self, TemplateError> {
        let mut registry = Self::new();
        for template in templates {
            registry.register(template)?;
        }
        Ok(registry)
    }

    /// Adds a template to the catalog.
    ///
    /// A template whose ID is already registered replaces the earlier one in
    /// its original slot. Moving an ID to a different path type is rejected.
    pub fn register(&mut self, template: StageTemplate) -> Result<(), TemplateError> {
        template.validate()?;

        match self
            .templates
            .iter_mut()
            .find(|t| t.template_id == template.template_id)
        {
            Some(existing) if existing.path_type != template.path_type => {
                Err(TemplateError::PathTypeMismatch {
                    template_id: template.template_id,
                    existing: existing.path_type.clone(),
                })
            }
            Some(existing) => {
                tracing::debug!(template_id = %template.template_id, "Replacing stage template");
                *existing = template;
                Ok(())
            }
            None => {
                tracing::debug!(
                    template_id = %template.template_id,
                    path_type = %template.path_type,
                    "Registering stage template"
                );
                self.templates.push(template);
                Ok(())
            }
        }
    }

    /// Looks up a template by ID.
    pub fn get(&self, template_id: &str) -> Option<&StageTemplate> {
        self.templates.iter().find(|t| t.template_id == template_id)
    }

    /// Returns every template in registration order.
    pub fn templates(&self) -> &[StageTemplate] {
        &self.templates
    }

    /// Returns the templates registered under a path type, in registration order.
    pub fn for_path_type<'a, 'b>(
        &'a self,
        path_type: &'b ProcessPathType,
    ) -> impl Iterator<Item = &'a StageTemplate> {
        self.templates.iter().filter(move |t| &t.path_type == path_type)
    }

    /// Returns the number of registered templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Selects the template for an order.
    ///
    /// Among templates registered under `path_type` whose criteria accept
    /// `item_count`, the highest priority wins and ties go to the earliest
    /// registered. There is no fallback to other path types.
    pub fn select(
        &self,
        path_type: &ProcessPathType,
        item_count: u32,
    ) -> Result<&StageTemplate, TemplateError> {
        self.for_path_type(path_type)
            .filter(|t| t.selection_criteria.accepts(item_count))
            .reduce(|best, candidate| {
                if candidate.selection_criteria.priority > best.selection_criteria.priority {
                    candidate
                } else {
                    best
                }
            })
            .ok_or_else(|| TemplateError::NoMatchingTemplate {
                path_type: path_type.clone(),
                item_count,
            })
    }
}
