// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use plandesk_app::{
    DeleteRequest, Directory, EntityKind, FetchRequest, ListCache, PageParams, RemoteSort,
    RequestStatus, Row, RowId,
};

/// Hosts a directory behind the console: unsorted full listings come from the
/// list cache, everything else goes straight through it.
pub struct DirectoryRuntime<D> {
    cache: ListCache<D>,
}

impl<D: Directory> DirectoryRuntime<D> {
    pub fn new(directory: D) -> Self {
        Self {
            cache: ListCache::new(directory),
        }
    }
}

impl<D: Directory> plandesk_tui::AppRuntime for DirectoryRuntime<D> {
    fn load_rows(
        &mut self,
        kind: EntityKind,
        force_refresh: bool,
        sort: Option<&RemoteSort>,
    ) -> Result<Vec<Row>> {
        match sort {
            Some(sort) => self.cache.list(kind, PageParams::ALL, Some(sort)),
            None => self.cache.get_or_fetch(kind, force_refresh),
        }
    }

    fn fetch_sorted(&mut self, request: &FetchRequest) -> Result<Vec<Row>> {
        self.cache
            .list(request.kind, request.page, Some(&request.sort))
    }

    fn delete_row(&mut self, request: &DeleteRequest) -> Result<()> {
        log::info!("deleting {} {}", request.kind.as_str(), request.id);
        self.cache.delete(request.kind, &request.id)
    }

    fn transition_request(
        &mut self,
        kind: EntityKind,
        id: &RowId,
        status: RequestStatus,
    ) -> Result<()> {
        log::info!("marking request {id} {}", status.as_str());
        self.cache.transition_request(kind, id, status)
    }

    fn set_admin(&mut self, kind: EntityKind, id: &RowId, admin: bool) -> Result<()> {
        self.cache.set_admin(kind, id, admin)
    }

    fn assign_plan(&mut self, plan_id: &RowId, organization_ids: &[RowId]) -> Result<()> {
        log::info!(
            "assigning plan {plan_id} to {} organizations",
            organization_ids.len()
        );
        self.cache.assign_plan(plan_id, organization_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::DirectoryRuntime;
    use anyhow::Result;
    use plandesk_app::{
        DeleteRequest, EntityKind, FetchRequest, PageParams, RemoteSort, RequestId, RowId,
        SortDirection,
    };
    use plandesk_testkit::{DemoSizes, DirectoryCall, MemoryDirectory, numbered_rows};
    use plandesk_tui::AppRuntime;

    fn runtime_with_organizations(count: usize) -> DirectoryRuntime<MemoryDirectory> {
        let mut directory = MemoryDirectory::new();
        directory.insert(EntityKind::Organization, numbered_rows(count));
        DirectoryRuntime::new(directory)
    }

    fn list_calls(runtime: &DirectoryRuntime<MemoryDirectory>) -> usize {
        runtime
            .cache
            .inner()
            .calls()
            .iter()
            .filter(|call| matches!(call, DirectoryCall::List { .. }))
            .count()
    }

    #[test]
    fn repeated_loads_hit_the_cache_until_forced() -> Result<()> {
        let mut runtime = runtime_with_organizations(3);

        assert_eq!(runtime.load_rows(EntityKind::Organization, false, None)?.len(), 3);
        assert_eq!(runtime.load_rows(EntityKind::Organization, false, None)?.len(), 3);
        assert_eq!(list_calls(&runtime), 1);

        runtime.load_rows(EntityKind::Organization, true, None)?;
        assert_eq!(list_calls(&runtime), 2);
        Ok(())
    }

    #[test]
    fn delete_drops_the_cached_listing() -> Result<()> {
        let mut runtime = runtime_with_organizations(3);
        runtime.load_rows(EntityKind::Organization, false, None)?;

        runtime.delete_row(&DeleteRequest {
            request_id: RequestId::new(1),
            kind: EntityKind::Organization,
            id: RowId::new("2")?,
        })?;

        let rows = runtime.load_rows(EntityKind::Organization, false, None)?;
        let ids: Vec<String> = rows.iter().map(|row| row.id.to_string()).collect();
        assert_eq!(ids, ["1", "3"]);
        Ok(())
    }

    #[test]
    fn sorted_fetch_passes_the_backend_field() -> Result<()> {
        let mut runtime = runtime_with_organizations(3);
        let sort = RemoteSort {
            order_by: "name".to_owned(),
            direction: SortDirection::Desc,
        };

        let rows = runtime.fetch_sorted(&FetchRequest {
            request_id: RequestId::new(4),
            kind: EntityKind::Organization,
            page: PageParams::ALL,
            sort: sort.clone(),
        })?;

        assert_eq!(rows.first().map(|row| row.id.to_string()).as_deref(), Some("3"));
        assert_eq!(
            runtime.cache.inner().calls().last(),
            Some(&DirectoryCall::List {
                kind: EntityKind::Organization,
                page: PageParams::ALL,
                sort: Some(sort),
            })
        );
        Ok(())
    }

    #[test]
    fn sorted_load_skips_the_cache() -> Result<()> {
        let mut runtime = runtime_with_organizations(3);
        runtime.load_rows(EntityKind::Organization, false, None)?;
        let sort = RemoteSort {
            order_by: "name".to_owned(),
            direction: SortDirection::Desc,
        };

        let sorted = runtime.load_rows(EntityKind::Organization, false, Some(&sort))?;
        assert_eq!(sorted.first().map(|row| row.id.to_string()).as_deref(), Some("3"));
        assert_eq!(list_calls(&runtime), 2);

        let cached = runtime.load_rows(EntityKind::Organization, false, None)?;
        assert_eq!(cached.first().map(|row| row.id.to_string()).as_deref(), Some("1"));
        assert_eq!(list_calls(&runtime), 2);
        Ok(())
    }

    #[test]
    fn demo_directory_fills_every_kind() -> Result<()> {
        let mut runtime = DirectoryRuntime::new(MemoryDirectory::seeded(7));
        let sizes = DemoSizes::default();

        assert_eq!(
            runtime.load_rows(EntityKind::Organization, false, None)?.len(),
            sizes.organizations
        );
        assert_eq!(runtime.load_rows(EntityKind::User, false, None)?.len(), sizes.users);
        assert_eq!(
            runtime.load_rows(EntityKind::ViewOnly, false, None)?.len(),
            sizes.audit
        );
        Ok(())
    }
}
