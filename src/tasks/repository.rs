//! Clone the dotfiles repository, or fast-forward an existing checkout.
use anyhow::Result;

use super::{Context, Task, TaskResult, task_deps};
use crate::resources::repository::GitCheckoutResource;
use crate::resources::{Applicable, Resource, ResourceChange, ResourceState};

/// Clone the dotfiles repository, or fast-forward an existing checkout.
#[derive(Debug)]
pub struct CloneRepository;

impl Task for CloneRepository {
    fn name(&self) -> &'static str {
        "Clone dotfiles repository"
    }

    task_deps![super::packages::InstallMinimalPackages];

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let repo = &ctx.settings.repository;
        if repo.url.is_empty() {
            ctx.log.warn(
                "no repository URL configured; set repository.url, DOTFILES_REPO or --repo",
            );
            return Ok(TaskResult::Skipped("no repository configured".to_string()));
        }

        let checkout = GitCheckoutResource::new(
            repo.url.clone(),
            repo.reference.clone(),
            ctx.dotfiles_dir(),
            ctx.fs_ops.as_ref(),
            ctx.executor.as_ref(),
        );

        match checkout.current_state()? {
            ResourceState::Invalid { reason } => anyhow::bail!(reason),
            ResourceState::Correct => update(ctx, &checkout),
            ResourceState::Missing | ResourceState::Incorrect { .. } => {
                if ctx.dry_run() {
                    ctx.log
                        .dry_run(&format!("would clone {}", checkout.description()));
                    return Ok(TaskResult::DryRun);
                }
                checkout.apply()?;
                ctx.log.info(&format!("cloned {}", checkout.description()));
                Ok(TaskResult::Ok)
            }
        }
    }
}

/// Fast-forward the existing checkout; a failed pull leaves it as it is.
fn update(ctx: &Context, checkout: &GitCheckoutResource<'_>) -> Result<TaskResult> {
    let dir = checkout.dir.display();
    if ctx.dry_run() {
        ctx.log.dry_run(&format!("would pull --ff-only in {dir}"));
        return Ok(TaskResult::DryRun);
    }
    match checkout.update() {
        Ok(ResourceChange::Applied) => {
            ctx.log.info(&format!("updated {dir}"));
            Ok(TaskResult::Ok)
        }
        Ok(ResourceChange::AlreadyCorrect) => {
            Ok(TaskResult::Skipped("already up to date".to_string()))
        }
        Ok(ResourceChange::Skipped { reason }) => Ok(TaskResult::Skipped(reason)),
        Err(e) => {
            ctx.log.warn(&format!(
                "could not update {dir}: {e:#}; continuing with the existing checkout"
            ));
            Ok(TaskResult::Skipped("update failed, using existing checkout".to_string()))
        }
    }
}
