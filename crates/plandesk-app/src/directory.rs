// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::collections::HashMap;

use crate::ids::RowId;
use crate::model::{EntityKind, RequestStatus, Row};
use crate::sort::{PageParams, RemoteSort};

/// Remote data access the table engine calls through. Implementations own
/// transport and wire formats.
pub trait Directory {
    fn list(
        &mut self,
        kind: EntityKind,
        page: PageParams,
        sort: Option<&RemoteSort>,
    ) -> Result<Vec<Row>>;

    fn delete(&mut self, kind: EntityKind, id: &RowId) -> Result<()>;

    fn transition_request(
        &mut self,
        kind: EntityKind,
        id: &RowId,
        status: RequestStatus,
    ) -> Result<()>;

    fn set_admin(&mut self, kind: EntityKind, id: &RowId, admin: bool) -> Result<()>;

    fn assign_plan(&mut self, plan_id: &RowId, organization_ids: &[RowId]) -> Result<()>;
}

/// Memoizes full unsorted listings per kind. Sorted and paged listings go
/// straight to the wrapped directory and are never cached; mutations drop the
/// cached copy.
pub struct ListCache<D> {
    inner: D,
    lists: HashMap<EntityKind, Vec<Row>>,
}

impl<D: Directory> ListCache<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            lists: HashMap::new(),
        }
    }

    pub fn get_or_fetch(&mut self, kind: EntityKind, force_refresh: bool) -> Result<Vec<Row>> {
        if !force_refresh && let Some(rows) = self.lists.get(&kind) {
            log::debug!("list cache hit for {}", kind.as_str());
            return Ok(rows.clone());
        }
        let rows = self.inner.list(kind, PageParams::ALL, None)?;
        log::debug!("fetched {} {} rows", rows.len(), kind.as_str());
        self.lists.insert(kind, rows.clone());
        Ok(rows)
    }

    pub fn invalidate(&mut self, kind: EntityKind) {
        self.lists.remove(&kind);
    }

    pub fn is_cached(&self, kind: EntityKind) -> bool {
        self.lists.contains_key(&kind)
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }
}

impl<D: Directory> Directory for ListCache<D> {
    fn list(
        &mut self,
        kind: EntityKind,
        page: PageParams,
        sort: Option<&RemoteSort>,
    ) -> Result<Vec<Row>> {
        if sort.is_none() && page == PageParams::ALL {
            return self.get_or_fetch(kind, false);
        }
        self.inner.list(kind, page, sort)
    }

    fn delete(&mut self, kind: EntityKind, id: &RowId) -> Result<()> {
        self.inner.delete(kind, id)?;
        self.invalidate(kind);
        Ok(())
    }

    fn transition_request(
        &mut self,
        kind: EntityKind,
        id: &RowId,
        status: RequestStatus,
    ) -> Result<()> {
        self.inner.transition_request(kind, id, status)?;
        self.invalidate(EntityKind::Pending);
        self.invalidate(EntityKind::Request);
        Ok(())
    }

    fn set_admin(&mut self, kind: EntityKind, id: &RowId, admin: bool) -> Result<()> {
        self.inner.set_admin(kind, id, admin)?;
        self.invalidate(kind);
        Ok(())
    }

    fn assign_plan(&mut self, plan_id: &RowId, organization_ids: &[RowId]) -> Result<()> {
        self.inner.assign_plan(plan_id, organization_ids)?;
        self.invalidate(EntityKind::Insurance);
        self.invalidate(EntityKind::Organization);
        Ok(())
    }
}
