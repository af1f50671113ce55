// Copyright 2024 The NativeLink Authors. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

use async_trait::async_trait;
use dockwork_error::{Error, error_if, make_input_err};
use serde::{Deserialize, Serialize};

use crate::worker_messages::Worker;

/// Fields a worker listing may be ordered by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Id,
    Name,
    Port,
    Status,
}

impl SortField {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Port => "port",
            Self::Status => "status",
        }
    }
}

impl FromStr for SortField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "port" => Ok(Self::Port),
            "status" => Ok(Self::Status),
            _ => Err(make_input_err!(
                "Cannot sort workers by '{s}', expected one of id, name, port, status"
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(make_input_err!(
                "Invalid sort direction '{s}', expected asc or desc"
            ))
        }
    }
}

/// Ordering requested for a worker listing. Defaults to `id,asc`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Sort {
    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Builds a sort from the raw values of a `sort` query parameter.
    ///
    /// Both `sort=name,desc` and `sort=name&sort=desc` are accepted. No
    /// values yields the default.
    pub fn from_params<S: AsRef<str>>(values: &[S]) -> Result<Self, Error> {
        let tokens: Vec<&str> = values
            .iter()
            .flat_map(|value| value.as_ref().split(','))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect();
        match tokens.as_slice() {
            [] => Ok(Self::default()),
            [field] => Ok(Self::new(field.parse()?, SortDirection::Asc)),
            [field, direction] => Ok(Self::new(field.parse()?, direction.parse()?)),
            _ => Err(make_input_err!(
                "Expected sort as 'field' or 'field,direction', got {tokens:?}"
            )),
        }
    }

    /// Compares two workers under this ordering. Ties are broken by id in
    /// ascending order so pages are stable.
    pub fn compare(&self, a: &Worker, b: &Worker) -> Ordering {
        let ordering = match self.field {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Name => a.name.cmp(&b.name),
            SortField::Port => compare_ports(&a.port, &b.port),
            SortField::Status => a.status.cmp(&b.status),
        };
        let ordering = match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        ordering.then_with(|| a.id.cmp(&b.id))
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        write!(f, "{},{direction}", self.field.as_str())
    }
}

// Ports are compared numerically when both parse, so "9000" sorts before
// "31007".
fn compare_ports(a: &str, b: &str) -> Ordering {
    match (a.parse::<u32>(), b.parse::<u32>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

/// A validated request for one page of workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    size: usize,
    sort: Sort,
}

impl PageRequest {
    pub fn try_new(page: usize, size: usize, sort: Sort) -> Result<Self, Error> {
        error_if!(size == 0, "Page size must be greater than zero");
        Ok(Self { page, size, sort })
    }

    pub const fn page(&self) -> usize {
        self.page
    }

    pub const fn size(&self) -> usize {
        self.size
    }

    pub const fn sort(&self) -> Sort {
        self.sort
    }

    pub const fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

/// One page of a listing, with enough metadata to walk the rest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    /// Zero based page index.
    pub number: usize,
    pub size: usize,
    pub number_of_elements: usize,
    pub total_elements: usize,
    pub total_pages: usize,
    pub first: bool,
    pub last: bool,
    pub sort: Sort,
}

impl Page<Worker> {
    /// Orders `workers` as requested and cuts out the requested page.
    pub fn from_unsorted(mut workers: Vec<Worker>, request: &PageRequest) -> Self {
        let sort = request.sort();
        workers.sort_by(|a, b| sort.compare(a, b));

        let total_elements = workers.len();
        let total_pages = total_elements.div_ceil(request.size());
        let content: Vec<Worker> = workers
            .into_iter()
            .skip(request.offset())
            .take(request.size())
            .collect();
        Self {
            number_of_elements: content.len(),
            content,
            number: request.page(),
            size: request.size(),
            total_elements,
            total_pages,
            first: request.page() == 0,
            last: request.page().saturating_add(1) >= total_pages,
            sort,
        }
    }
}

/// Keyed persistence for worker records.
#[async_trait]
pub trait WorkerStore: Send + Sync + fmt::Debug + 'static {
    /// Looks up the record for a container name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Worker>, Error>;

    /// Inserts or replaces the record with the same name and returns it as
    /// stored. A record without an id gets the next free one; a record
    /// replacing an existing one keeps the existing id.
    async fn save(&self, worker: Worker) -> Result<Worker, Error>;

    /// Returns one page of records in the requested order.
    async fn find_all(&self, request: PageRequest) -> Result<Page<Worker>, Error>;
}
