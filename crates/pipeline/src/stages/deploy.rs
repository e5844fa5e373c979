//! DEPLOY: push the generated project to the source-control host, link it
//! into the browser IDE, and notify the messaging host.

use serde_json::json;

use relift_core::deployment::{
    ide_url, repository_slug, DeploymentDescriptor, DeploymentMode, CI_WORKFLOW_PATH,
    COMMIT_MESSAGE,
};
use relift_core::project::GeneratedProject;
use relift_core::providers::{
    MESSAGING, OP_CREATE_REPOSITORY, OP_CREATE_WORKFLOW, OP_POST_MESSAGE, OP_PUSH_FILES,
    SOURCE_CONTROL,
};
use relift_core::status::Stage;
use relift_tools::ToolError;

use crate::artifacts;
use crate::context::StageContext;
use crate::error::StageError;

pub const DEFAULT_BRANCH: &str = "main";

struct Repository {
    owner: String,
    name: String,
    url: String,
}

pub async fn execute(
    ctx: &StageContext,
    project: &GeneratedProject,
) -> Result<DeploymentDescriptor, StageError> {
    let local_path = project.root.display().to_string();

    let mut descriptor = if ctx.config.skip_deployment {
        tracing::info!(run_id = %ctx.run_id, "Deployment disabled, keeping project local");
        DeploymentDescriptor {
            mode: DeploymentMode::Skipped,
            repository_url: None,
            owner: None,
            repository: None,
            ide_url: None,
            commit_message: None,
            ci_workflow: false,
            notified: false,
            local_path,
            reason: Some("Deployment disabled for this run".to_string()),
        }
    } else {
        match push(ctx, project).await {
            Ok((repo, ci_workflow)) => DeploymentDescriptor {
                mode: DeploymentMode::Remote,
                ide_url: Some(ide_url(&repo.owner, &repo.name)),
                repository_url: Some(repo.url),
                owner: Some(repo.owner),
                repository: Some(repo.name),
                commit_message: Some(COMMIT_MESSAGE.to_string()),
                ci_workflow,
                notified: false,
                local_path,
                reason: None,
            },
            Err(e) if ctx.config.tolerate_deploy_failure => {
                tracing::warn!(
                    run_id = %ctx.run_id,
                    error = %e,
                    "Source-control push failed, project kept local",
                );
                DeploymentDescriptor {
                    mode: DeploymentMode::LocalOnly,
                    repository_url: None,
                    owner: None,
                    repository: None,
                    ide_url: None,
                    commit_message: None,
                    ci_workflow: false,
                    notified: false,
                    local_path,
                    reason: Some(e.to_string()),
                }
            }
            Err(e) => return Err(StageError::Deploy(e.to_string())),
        }
    };

    if !ctx.config.skip_notification {
        ctx.report(Stage::Deploy, 90, "Notifying messaging host");
        descriptor.notified = notify(ctx, &descriptor).await;
    }
    Ok(descriptor)
}

/// Create the repository, commit every file, and add the CI workflow.
///
/// Returns the repository and whether the workflow was created.
async fn push(
    ctx: &StageContext,
    project: &GeneratedProject,
) -> Result<(Repository, bool), ToolError> {
    let slug = repository_slug(&ctx.run_name);

    ctx.report(Stage::Deploy, 10, format!("Creating repository {slug}"));
    let created = ctx
        .call(
            SOURCE_CONTROL,
            OP_CREATE_REPOSITORY,
            json!({
                "name": slug,
                "description": ctx.config.description.clone().unwrap_or_else(|| {
                    format!("Generated from legacy source by relift ({})", project.name)
                }),
                "private": true,
                "auto_init": false,
            }),
        )
        .await?;
    let repo = repository_from(&created, &slug, &ctx.settings().repository_owner);

    ctx.report(
        Stage::Deploy,
        40,
        format!("Pushing {} files", project.files.len()),
    );
    let files: Vec<_> = project
        .files
        .iter()
        .map(|f| json!({ "path": f.path, "content": f.content }))
        .collect();
    ctx.call(
        SOURCE_CONTROL,
        OP_PUSH_FILES,
        json!({
            "owner": repo.owner,
            "repo": repo.name,
            "branch": DEFAULT_BRANCH,
            "message": COMMIT_MESSAGE,
            "files": files,
        }),
    )
    .await?;

    let mut ci_workflow = false;
    if ctx.config.create_ci_workflow {
        ctx.report(Stage::Deploy, 70, "Creating CI workflow");
        match ctx
            .call(
                SOURCE_CONTROL,
                OP_CREATE_WORKFLOW,
                json!({
                    "owner": repo.owner,
                    "repo": repo.name,
                    "branch": DEFAULT_BRANCH,
                    "path": CI_WORKFLOW_PATH,
                    "content": artifacts::ci_workflow(),
                }),
            )
            .await
        {
            Ok(_) => ci_workflow = true,
            Err(e) => {
                tracing::warn!(run_id = %ctx.run_id, error = %e, "CI workflow not created");
            }
        }
    }

    Ok((repo, ci_workflow))
}

/// Read owner/name/url from the host's reply, falling back to the
/// requested slug and the configured owner.
fn repository_from(value: &serde_json::Value, slug: &str, default_owner: &str) -> Repository {
    let body = value.get("data").unwrap_or(value);
    let text = |key: &str| {
        body.get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let owner = text("owner")
        .or_else(|| {
            body.get("owner")
                .and_then(|o| o.get("login"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| default_owner.to_string());
    let name = text("name").unwrap_or_else(|| slug.to_string());
    let url = text("html_url")
        .or_else(|| text("url"))
        .unwrap_or_else(|| format!("https://github.com/{owner}/{name}"));
    Repository { owner, name, url }
}

/// Best effort; the outcome never affects the stage.
async fn notify(ctx: &StageContext, descriptor: &DeploymentDescriptor) -> bool {
    let text = match (&descriptor.mode, &descriptor.repository_url) {
        (DeploymentMode::Remote, Some(url)) => {
            format!("Run {} deployed: {url}", ctx.run_name)
        }
        _ => format!(
            "Run {} finished; project kept at {}",
            ctx.run_name, descriptor.local_path
        ),
    };
    match ctx
        .call(
            MESSAGING,
            OP_POST_MESSAGE,
            json!({
                "text": text,
                "run_id": ctx.run_id.to_string(),
                "mode": descriptor.mode,
                "ide_url": descriptor.ide_url,
            }),
        )
        .await
    {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(run_id = %ctx.run_id, error = %e, "Notification not delivered");
            false
        }
    }
}
