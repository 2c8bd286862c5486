//! User lifecycle tests.

use idm_model::{derive_user_id, User, MAX_USER_ID_LEN};
use idm_store::{IdentityStore, StoreError};

use crate::common::{TestEnv, ROLES_DN, USERS_DN};

/// Full names round-trip through the directory with the split names.
#[tokio::test]
async fn test_create_then_get_user() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    for (full_name, first, last) in [
        ("Anil Saldhana", "Anil", "Saldhana"),
        ("John Doe", "John", "Doe"),
        ("Mary Ann Smith", "Mary", "Smith"),
    ] {
        env.store.create_user(full_name).await?;

        let user = env
            .store
            .get_user(full_name)
            .await?
            .ok_or_else(|| anyhow::anyhow!("{full_name} not found"))?;
        assert_eq!(user.full_name, full_name);
        assert_eq!(user.first_name.as_deref(), Some(first));
        assert_eq!(user.last_name.as_deref(), Some(last));
    }

    Ok(())
}

/// "Anil Saldhana" is stored under a truncated derived id.
#[tokio::test]
async fn test_derived_user_id() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let user = env.store.create_user("Anil Saldhana").await?;

    assert_eq!(user.id, "ASaldha");
    assert!(env
        .directory
        .contains(&format!("uid=ASaldha,{USERS_DN}")));

    let stored = env.entry(&format!("uid=ASaldha,{USERS_DN}"))?;
    assert_eq!(stored.first("cn"), Some("Anil Saldhana"));
    assert_eq!(stored.first("givenName"), Some("Anil"));
    assert_eq!(stored.first("sn"), Some("Saldhana"));
    assert!(stored.has_object_class("inetOrgPerson"));

    Ok(())
}

/// Derived ids never exceed the limit and are a prefix of initial + last name.
#[tokio::test]
async fn test_user_id_is_bounded_prefix() -> anyhow::Result<()> {
    for (first, last) in [
        ("Anil", "Saldhana"),
        ("Bo", "Li"),
        ("Alexandra", "Featherstonehaugh"),
        ("Zoe", "Abcdef"),
    ] {
        let id = derive_user_id(first, last);
        let full: String = first.chars().take(1).chain(last.chars()).collect();

        assert!(id.chars().count() <= MAX_USER_ID_LEN);
        if full.chars().count() > MAX_USER_ID_LEN {
            assert!(full.starts_with(&id));
        } else {
            assert_eq!(id, full);
        }
    }

    Ok(())
}

/// Removing a user makes it unreachable by name.
#[tokio::test]
async fn test_remove_then_get_user() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let user = env.store.create_user("John Doe").await?;

    env.store.remove_user(&user).await?;

    assert!(env.store.get_user("John Doe").await?.is_none());
    assert!(!env.directory.contains(&format!("uid=JDoe,{USERS_DN}")));

    Ok(())
}

/// Removing a missing user is an error.
#[tokio::test]
async fn test_remove_missing_user() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let user = env.store.create_user("John Doe").await?;
    env.store.remove_user(&user).await?;

    let err = env.store.remove_user(&user).await.unwrap_err();
    assert!(err.is_not_found());

    Ok(())
}

/// Removing a user drops it from the roles that listed it.
#[tokio::test]
async fn test_remove_user_unlinks_roles() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let user = env.store.create_user("John Doe").await?;
    let role = env.store.create_role("developer").await?;
    let group = env.store.create_group("engineering", None).await?;
    env.store.create_membership(&role, &user, &group).await?;

    env.store.remove_user(&user).await?;

    let role = env
        .store
        .get_role("developer")
        .await?
        .ok_or_else(|| anyhow::anyhow!("role missing"))?;
    assert!(role.members.is_empty());
    assert_eq!(env.members(&format!("cn=developer,{ROLES_DN}"))?, vec![" "]);

    Ok(())
}

/// Names outside the splitting policy are rejected before touching the
/// directory.
#[tokio::test]
async fn test_invalid_full_names() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    for name in ["", "Prince", "Juan Carlos de Borbon"] {
        let err = env.store.create_user(name).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidName(_)), "{name}: {err}");
    }
    assert!(env.directory.contains(crate::common::SUFFIX));
    assert!(!env.directory.contains(USERS_DN));

    Ok(())
}

/// A second user mapping onto the same derived id collides.
#[tokio::test]
async fn test_user_id_collision() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    env.store.create_user("John Smithson").await?;

    let err = env.store.create_user("Jane Smithsonian").await.unwrap_err();
    assert!(err.is_duplicate());
    assert!(env.store.get_user("Jane Smithsonian").await?.is_none());

    Ok(())
}

/// Handles built locally can be used once the user exists.
#[tokio::test]
async fn test_local_handle_is_resolved_by_name() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    env.store.create_user("John Doe").await?;
    let local = User::from_full_name("John Doe")?;

    let attributes = env.store.get_user_attributes(&local).await?;
    assert!(attributes.is_empty());

    Ok(())
}
