//! Name lookup tests.

use idm_store::IdentityStore;

use crate::common::{TestEnv, ROLES_DN};

/// An asterisk is a literal name, never a wildcard.
#[tokio::test]
async fn test_asterisk_is_a_literal_name() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    env.store.create_role("admin").await?;
    env.store.create_group("acme", None).await?;
    env.store.create_user("John Doe").await?;
    env.store.create_user("Jane Roe").await?;

    assert!(env.store.get_role("*").await?.is_none());
    assert!(env.store.get_group("*").await?.is_none());
    assert!(env.store.get_user("*").await?.is_none());

    let star = env.store.create_role("*").await?;
    assert_eq!(star.name, "*");
    assert!(env.directory.contains(&format!("cn=*,{ROLES_DN}")));

    let fetched = env
        .store
        .get_role("*")
        .await?
        .ok_or_else(|| anyhow::anyhow!("role missing"))?;
    assert_eq!(fetched.name, "*");
    assert_eq!(
        env.store
            .get_role("admin")
            .await?
            .map(|role| role.name),
        Some("admin".to_string())
    );

    Ok(())
}
