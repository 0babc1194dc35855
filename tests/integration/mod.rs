mod catalogue_layout;
mod prune_workflow;
mod support;
mod sync_workflow;
mod update_pipeline;
