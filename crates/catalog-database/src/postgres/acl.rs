//! ACL rows on PostgreSQL.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use catalog_core::AppError;
use catalog_core::result::AppResult;
use catalog_core::types::{EntityId, PrincipalId};
use catalog_entity::{AccessControlList, AccessType, ResourceAccess};

use super::PgTx;
use super::error::db_error;
use crate::store::AclRows;

impl PgTx {
    async fn insert_grants(&mut self, acl: &AccessControlList) -> AppResult<()> {
        let mut resource_ids = Vec::new();
        let mut principal_ids = Vec::new();
        let mut access_types = Vec::new();
        for ra in &acl.resource_access {
            for access in &ra.access_types {
                resource_ids.push(acl.resource_id.value());
                principal_ids.push(ra.principal_id.value());
                access_types.push(*access);
            }
        }
        if resource_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO acl_resource_access (resource_id, principal_id, access_type) \
             SELECT * FROM UNNEST($1::BIGINT[], $2::BIGINT[], $3::access_type[])",
        )
        .bind(resource_ids)
        .bind(principal_ids)
        .bind(access_types)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to insert ACL grants", e))?;
        Ok(())
    }
}

#[async_trait]
impl AclRows for PgTx {
    async fn insert_acl(&mut self, acl: &AccessControlList) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO acls (resource_id, etag, created_by, created_on, modified_on) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(acl.resource_id)
        .bind(&acl.etag)
        .bind(acl.created_by)
        .bind(acl.created_on)
        .bind(acl.modified_on)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to insert ACL", e))?;

        self.insert_grants(acl).await
    }

    async fn find_acl(&mut self, resource_id: EntityId) -> AppResult<Option<AccessControlList>> {
        let acl = sqlx::query_as::<_, AccessControlList>(
            "SELECT resource_id, etag, created_by, created_on, modified_on \
             FROM acls WHERE resource_id = $1",
        )
        .bind(resource_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to find ACL", e))?;

        let Some(mut acl) = acl else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, (PrincipalId, AccessType)>(
            "SELECT principal_id, access_type FROM acl_resource_access \
             WHERE resource_id = $1 ORDER BY principal_id ASC",
        )
        .bind(resource_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to load ACL grants", e))?;

        let mut grouped: BTreeMap<PrincipalId, BTreeSet<AccessType>> = BTreeMap::new();
        for (principal_id, access) in rows {
            grouped.entry(principal_id).or_default().insert(access);
        }
        acl.resource_access = grouped
            .into_iter()
            .map(|(principal_id, access_types)| ResourceAccess {
                principal_id,
                access_types,
            })
            .collect();
        Ok(Some(acl))
    }

    async fn lock_acl(&mut self, resource_id: EntityId) -> AppResult<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT etag FROM acls WHERE resource_id = $1 FOR UPDATE")
            .bind(resource_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to lock ACL", e))
    }

    async fn update_acl(&mut self, acl: &AccessControlList) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE acls SET etag = $2, modified_on = $3 WHERE resource_id = $1")
                .bind(acl.resource_id)
                .bind(&acl.etag)
                .bind(acl.modified_on)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| db_error("Failed to update ACL", e))?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "ACL for {} not found",
                acl.resource_id
            )));
        }

        sqlx::query("DELETE FROM acl_resource_access WHERE resource_id = $1")
            .bind(acl.resource_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to clear ACL grants", e))?;

        self.insert_grants(acl).await
    }

    async fn delete_acl(&mut self, resource_id: EntityId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM acls WHERE resource_id = $1")
            .bind(resource_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to delete ACL", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn benefactors_granting(
        &mut self,
        principal_ids: &BTreeSet<PrincipalId>,
        benefactor_ids: &BTreeSet<EntityId>,
        access: AccessType,
    ) -> AppResult<BTreeSet<EntityId>> {
        let principals: Vec<i64> = principal_ids.iter().map(|p| p.value()).collect();
        let benefactors: Vec<i64> = benefactor_ids.iter().map(|b| b.value()).collect();

        let rows = sqlx::query_scalar::<_, EntityId>(
            "SELECT DISTINCT resource_id FROM acl_resource_access \
             WHERE resource_id = ANY($1) AND principal_id = ANY($2) AND access_type = $3",
        )
        .bind(benefactors)
        .bind(principals)
        .bind(access)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to filter accessible benefactors", e))?;
        Ok(rows.into_iter().collect())
    }

    async fn children_denying(
        &mut self,
        parent_id: EntityId,
        principal_ids: &BTreeSet<PrincipalId>,
        access: AccessType,
    ) -> AppResult<BTreeSet<EntityId>> {
        let principals: Vec<i64> = principal_ids.iter().map(|p| p.value()).collect();

        let rows = sqlx::query_scalar::<_, EntityId>(
            "SELECT e.id FROM entities e \
             JOIN acls a ON a.resource_id = e.id \
             WHERE e.parent_id = $1 \
             AND NOT EXISTS ( \
                SELECT 1 FROM acl_resource_access ra \
                WHERE ra.resource_id = e.id AND ra.principal_id = ANY($2) AND ra.access_type = $3 \
             )",
        )
        .bind(parent_id)
        .bind(principals)
        .bind(access)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to list non-visible children", e))?;
        Ok(rows.into_iter().collect())
    }
}
