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

use dockwork_config::stores::MemorySpec;
use dockwork_error::{Code, Error};
use dockwork_macro::dockwork_test;
use dockwork_store::memory_worker_store::MemoryWorkerStore;
use dockwork_util::store_trait::{PageRequest, Sort, SortDirection, SortField, WorkerStore};
use dockwork_util::worker_messages::{Worker, WorkerStatus};
use pretty_assertions::assert_eq;

#[dockwork_test]
async fn save_assigns_ids_in_registration_order() -> Result<(), Error> {
    let store = MemoryWorkerStore::new(&MemorySpec::default());

    let first = store
        .save(Worker::new("worker-b", "31001", WorkerStatus::Active))
        .await?;
    let second = store
        .save(Worker::new("worker-a", "31002", WorkerStatus::Inactive))
        .await?;

    assert_eq!(first.id, Some(1));
    assert_eq!(second.id, Some(2));
    assert_eq!(store.len(), 2);
    Ok(())
}

#[dockwork_test]
async fn save_replaces_record_with_same_name_and_keeps_id() -> Result<(), Error> {
    let store = MemoryWorkerStore::new(&MemorySpec::default());
    let saved = store
        .save(Worker::new("worker-7", "31007", WorkerStatus::Active))
        .await?;

    let mut updated = saved.clone();
    updated.status = WorkerStatus::Inactive;
    updated.id = None;
    let updated = store.save(updated).await?;

    assert_eq!(updated.id, saved.id);
    assert_eq!(
        store.find_by_name("worker-7").await?,
        Some(Worker {
            id: saved.id,
            name: "worker-7".to_string(),
            port: "31007".to_string(),
            status: WorkerStatus::Inactive,
        })
    );
    assert_eq!(store.len(), 1);
    Ok(())
}

#[dockwork_test]
async fn find_by_name_of_unknown_worker_is_none() -> Result<(), Error> {
    let store = MemoryWorkerStore::new(&MemorySpec::default());
    assert_eq!(store.find_by_name("ghost").await?, None);
    Ok(())
}

#[dockwork_test]
async fn save_rejects_empty_name() -> Result<(), Error> {
    let store = MemoryWorkerStore::new(&MemorySpec::default());
    let err = store
        .save(Worker::new("", "31007", WorkerStatus::Active))
        .await
        .unwrap_err();
    assert_eq!(err.code, Code::InvalidArgument);
    assert!(store.is_empty());
    Ok(())
}

#[dockwork_test]
async fn find_all_pages_by_name() -> Result<(), Error> {
    let store = MemoryWorkerStore::new(&MemorySpec::default());
    for i in (0..25).rev() {
        store
            .save(Worker::new(
                format!("worker-{i:02}"),
                format!("{}", 31000 + i),
                WorkerStatus::Inactive,
            ))
            .await?;
    }

    let request = PageRequest::try_new(0, 10, Sort::new(SortField::Name, SortDirection::Asc))?;
    let page = store.find_all(request).await?;

    assert_eq!(page.content.len(), 10);
    assert_eq!(page.total_elements, 25);
    assert_eq!(page.total_pages, 3);
    let names: Vec<String> = page.content.into_iter().map(|w| w.name).collect();
    let expected: Vec<String> = (0..10).map(|i| format!("worker-{i:02}")).collect();
    assert_eq!(names, expected);
    Ok(())
}

#[dockwork_test]
async fn find_all_defaults_to_id_order() -> Result<(), Error> {
    let store = MemoryWorkerStore::new(&MemorySpec::default());
    store
        .save(Worker::new("zeta", "1", WorkerStatus::Active))
        .await?;
    store
        .save(Worker::new("alpha", "2", WorkerStatus::Active))
        .await?;

    let page = store
        .find_all(PageRequest::try_new(0, 10, Sort::default())?)
        .await?;
    let names: Vec<&str> = page.content.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, vec!["zeta", "alpha"]);
    Ok(())
}
