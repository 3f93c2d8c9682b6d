use crate::domain::auth::AuthenticatedUser;
use crate::domain::extension::Extension;
use crate::domain::types::{ExtensionId, TeamId};
use crate::forms::extensions::{AddExtensionForm, AddExtensionPayload};
use crate::repository::{ExtensionReader, ExtensionWriter};
use crate::services::hooks::HookRegistry;
use crate::services::{ServiceError, ServiceResult, ensure_role};
use crate::{SERVICE_ACCESS_ROLE, SERVICE_ADMIN_ROLE};

/// Binds a registered handler to an event for the caller's team.
pub fn create_extension<R>(
    repo: &R,
    hooks: &HookRegistry,
    user: &AuthenticatedUser,
    form: AddExtensionForm,
) -> ServiceResult<Extension>
where
    R: ExtensionWriter + ?Sized,
{
    ensure_role(user, SERVICE_ADMIN_ROLE)?;

    let payload = AddExtensionPayload::try_from(form)?;

    if !hooks.contains(payload.handler.as_str()) {
        return Err(ServiceError::Form(format!(
            "unknown handler: {}",
            payload.handler
        )));
    }

    let team_id = TeamId::new(user.hub_id)?;

    let extension = repo
        .create_extension(&payload.into_domain(team_id))
        .map_err(|err| {
            log::error!("Failed to create extension: {err}");
            err
        })?;

    log::info!(
        "Extension {} bound {} to {} in team {team_id}",
        extension.id,
        extension.handler,
        extension.event
    );

    Ok(extension)
}

pub fn list_extensions<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<Vec<Extension>>
where
    R: ExtensionReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;

    Ok(repo.list_extensions(team_id)?)
}

pub fn set_extension_active<R>(
    repo: &R,
    user: &AuthenticatedUser,
    extension_id: i32,
    is_active: bool,
) -> ServiceResult<Extension>
where
    R: ExtensionWriter + ?Sized,
{
    ensure_role(user, SERVICE_ADMIN_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;
    let extension_id = ExtensionId::new(extension_id)?;

    Ok(repo.set_extension_active(extension_id, team_id, is_active)?)
}
