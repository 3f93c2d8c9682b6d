use crate::domain::auth::AuthenticatedUser;
use crate::domain::territory::{Territory, TerritoryOverlap, find_overlaps};
use crate::domain::types::{TeamId, TerritoryId};
use crate::forms::territories::{AddTerritoryForm, AddTerritoryPayload};
use crate::repository::{MemberReader, TerritoryReader, TerritoryWriter};
use crate::services::{ServiceError, ServiceResult, ensure_role};
use crate::{SERVICE_ACCESS_ROLE, SERVICE_ADMIN_ROLE};

/// Creates a territory owned by an active member of the team.
pub fn create_territory<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: AddTerritoryForm,
) -> ServiceResult<Territory>
where
    R: TerritoryWriter + MemberReader + ?Sized,
{
    ensure_role(user, SERVICE_ADMIN_ROLE)?;

    let payload = AddTerritoryPayload::try_from(form)?;
    let team_id = TeamId::new(user.hub_id)?;

    let owner_is_active = repo
        .get_member_by_id(payload.owner_id, team_id)?
        .is_some_and(|member| member.is_active);
    if !owner_is_active {
        return Err(ServiceError::Form(format!(
            "member {} is not an active member of this team",
            payload.owner_id
        )));
    }

    if payload.rules.is_empty() {
        log::warn!("Territory {} has no rules and will never match", payload.name);
    }

    let territory = repo
        .create_territory(&payload.into_domain(team_id))
        .map_err(|err| {
            log::error!("Failed to create territory: {err}");
            err
        })?;

    Ok(territory)
}

pub fn list_territories<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<Vec<Territory>>
where
    R: TerritoryReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;

    Ok(repo.list_territories(team_id)?)
}

pub fn get_territory<R>(
    repo: &R,
    user: &AuthenticatedUser,
    territory_id: i32,
) -> ServiceResult<Territory>
where
    R: TerritoryReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;
    let territory_id = TerritoryId::new(territory_id)?;

    repo.get_territory_by_id(territory_id, team_id)?
        .ok_or(ServiceError::NotFound)
}

pub fn set_territory_active<R>(
    repo: &R,
    user: &AuthenticatedUser,
    territory_id: i32,
    is_active: bool,
) -> ServiceResult<Territory>
where
    R: TerritoryWriter + ?Sized,
{
    ensure_role(user, SERVICE_ADMIN_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;
    let territory_id = TerritoryId::new(territory_id)?;

    Ok(repo.set_territory_active(territory_id, team_id, is_active)?)
}

/// Pairs of active territories a single lead could satisfy at once.
pub fn list_overlaps<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<Vec<TerritoryOverlap>>
where
    R: TerritoryReader + ?Sized,
{
    ensure_role(user, SERVICE_ACCESS_ROLE)?;

    let team_id = TeamId::new(user.hub_id)?;
    let territories = repo.list_territories(team_id)?;

    Ok(find_overlaps(&territories))
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::lead::LeadField;
    use crate::domain::territory::TerritoryRule;
    use crate::domain::types::{MemberId, TerritoryName};
    use crate::forms::territories::TerritoryRuleForm;
    use crate::repository::mock::MockRepository;
    use crate::services::members::tests::sample_member;
    use crate::services::tests::admin_user;

    fn form(owner_id: i32) -> AddTerritoryForm {
        AddTerritoryForm {
            name: "DACH".to_string(),
            owner_id,
            priority: 1,
            rules: vec![TerritoryRuleForm {
                field: "country".to_string(),
                value: "DE".to_string(),
            }],
        }
    }

    #[test]
    fn inactive_owner_is_rejected() {
        let mut repo = MockRepository::new();
        repo.expect_get_member_by_id().returning(|id, _| {
            let mut member = sample_member(id.get());
            member.is_active = false;
            Ok(Some(member))
        });
        repo.expect_create_territory().never();

        let result = create_territory(&repo, &admin_user(), form(3));

        assert!(matches!(result, Err(ServiceError::Form(_))));
    }

    #[test]
    fn territory_is_created_for_active_owner() {
        let mut repo = MockRepository::new();
        repo.expect_get_member_by_id()
            .returning(|id, _| Ok(Some(sample_member(id.get()))));
        repo.expect_create_territory()
            .withf(|t| t.owner_id.get() == 3 && t.rules.len() == 1)
            .times(1)
            .returning(|t| {
                let now = Utc::now().naive_utc();
                Ok(Territory {
                    id: TerritoryId::new(1).unwrap(),
                    team_id: t.team_id,
                    name: t.name.clone(),
                    owner_id: t.owner_id,
                    priority: t.priority,
                    rules: t.rules.clone(),
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                })
            });

        let territory = create_territory(&repo, &admin_user(), form(3)).unwrap();

        assert_eq!(territory.rules[0].field, LeadField::Country);
    }

    #[test]
    fn unknown_territory_is_not_found() {
        let mut repo = MockRepository::new();
        repo.expect_get_territory_by_id().returning(|_, _| Ok(None));

        let result = get_territory(&repo, &admin_user(), 9);

        assert!(matches!(result, Err(ServiceError::NotFound)));
    }

    #[test]
    fn overlaps_come_from_the_teams_territories() {
        let mut repo = MockRepository::new();
        repo.expect_list_territories().returning(|team_id| {
            let now = Utc::now().naive_utc();
            let territory = |id: i32, value: &str| Territory {
                id: TerritoryId::new(id).unwrap(),
                team_id,
                name: TerritoryName::new(format!("T{id}")).unwrap(),
                owner_id: MemberId::new(1).unwrap(),
                priority: 1,
                rules: vec![TerritoryRule::new(LeadField::Country, value)],
                is_active: true,
                created_at: now,
                updated_at: now,
            };
            Ok(vec![territory(1, "DE"), territory(2, "de"), territory(3, "FR")])
        });

        let overlaps = list_overlaps(&repo, &admin_user()).unwrap();

        assert_eq!(overlaps.len(), 1);
        assert_eq!(overlaps[0].first.get(), 1);
        assert_eq!(overlaps[0].second.get(), 2);
    }
}
