//! The resources and data sources this provider ships.

pub mod consumption_budget;
pub mod resource_group;
pub mod subscription;
pub mod template_deployment;

use crate::resource::{DataSource, ManagedResource};

/// Every managed resource, in registration order.
pub fn all_resources() -> Vec<Box<dyn ManagedResource>> {
    vec![
        Box::new(resource_group::ResourceGroupResource),
        Box::new(consumption_budget::ResourceGroupBudgetResource),
        Box::new(consumption_budget::SubscriptionBudgetResource),
        Box::new(template_deployment::TemplateDeploymentResource),
    ]
}

/// Every data source, in registration order.
pub fn all_data_sources() -> Vec<Box<dyn DataSource>> {
    vec![
        Box::new(resource_group::ResourceGroupDataSource),
        Box::new(subscription::SubscriptionDataSource),
    ]
}
