use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{
    AtomicU64,
    Ordering,
};
use std::time::Duration;

use async_trait::async_trait;
use kube::ResourceExt;
use mi_core::k8s::*;
use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Verb {
    Get,
    Create,
    Update,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoreCall {
    pub verb: Verb,
    pub kind: String,
    pub key: ObjectKey,
}

type StoreKey = (String, ObjectKey);

// In-memory stand-in for the API server.  Objects are kept as JSON so a single store can hold
// any kind; every write bumps a global resourceVersion counter, and an update whose
// resourceVersion doesn't match the stored one fails with a 409 Conflict just like the real
// thing.
#[derive(Default)]
pub struct FakeClusterStore {
    objects: Mutex<HashMap<StoreKey, serde_json::Value>>,
    calls: Mutex<Vec<StoreCall>>,
    pending_conflicts: Mutex<HashMap<String, u32>>,
    last_version: AtomicU64,
    latency: Option<Duration>,
}

fn kind_of<K: kube::Resource<DynamicType = ()>>() -> String {
    K::kind(&()).to_string()
}

impl FakeClusterStore {
    pub fn new() -> FakeClusterStore {
        Default::default()
    }

    pub fn with<K>(self, obj: K) -> FakeClusterStore
    where
        K: kube::Resource<DynamicType = ()> + Serialize,
    {
        self.insert(obj);
        self
    }

    // Every call sleeps this long before doing anything, for exercising request timeouts.
    pub fn with_latency(mut self, latency: Duration) -> FakeClusterStore {
        self.latency = Some(latency);
        self
    }

    pub fn insert<K>(&self, mut obj: K)
    where
        K: kube::Resource<DynamicType = ()> + Serialize,
    {
        obj.meta_mut().resource_version = Some(self.next_version());
        let key = (kind_of::<K>(), ObjectKey::of(&obj));
        let val = serde_json::to_value(&obj).unwrap();
        self.objects.lock().unwrap().insert(key, val);
    }

    pub fn object<K>(&self, key: &ObjectKey) -> Option<K>
    where
        K: kube::Resource<DynamicType = ()> + DeserializeOwned,
    {
        let objects = self.objects.lock().unwrap();
        objects
            .get(&(kind_of::<K>(), key.clone()))
            .map(|v| serde_json::from_value(v.clone()).unwrap())
    }

    // The next `count` updates of kind K fail with a 409 Conflict before touching the object.
    pub fn inject_conflicts<K: kube::Resource<DynamicType = ()>>(&self, count: u32) {
        self.pending_conflicts.lock().unwrap().insert(kind_of::<K>(), count);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count<K: kube::Resource<DynamicType = ()>>(&self, verb: Verb) -> usize {
        let kind = kind_of::<K>();
        self.calls.lock().unwrap().iter().filter(|c| c.verb == verb && c.kind == kind).count()
    }

    pub fn write_count(&self) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.verb != Verb::Get).count()
    }

    fn next_version(&self) -> String {
        (self.last_version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    async fn wait(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn record(&self, verb: Verb, kind: &str, key: &ObjectKey) {
        self.calls.lock().unwrap().push(StoreCall { verb, kind: kind.into(), key: key.clone() });
    }

    fn take_conflict(&self, kind: &str) -> bool {
        let mut pending = self.pending_conflicts.lock().unwrap();
        match pending.get_mut(kind) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            },
            _ => false,
        }
    }
}

#[async_trait]
impl<K> ObjectStore<K> for FakeClusterStore
where
    K: kube::Resource<DynamicType = ()> + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &ObjectKey) -> anyhow::Result<Option<K>> {
        let kind = kind_of::<K>();
        self.wait().await;
        self.record(Verb::Get, &kind, key);

        let objects = self.objects.lock().unwrap();
        match objects.get(&(kind, key.clone())) {
            Some(v) => Ok(Some(serde_json::from_value(v.clone())?)),
            None => Ok(None),
        }
    }

    async fn create(&self, obj: &K) -> anyhow::Result<K> {
        let kind = kind_of::<K>();
        let key = ObjectKey::of(obj);
        self.wait().await;
        self.record(Verb::Create, &kind, &key);

        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&(kind.clone(), key.clone())) {
            return Err(already_exists_error(&kind, &key.name));
        }

        let mut created = obj.clone();
        created.meta_mut().resource_version = Some(self.next_version());
        objects.insert((kind, key), serde_json::to_value(&created)?);
        Ok(created)
    }

    async fn update(&self, obj: &K) -> anyhow::Result<K> {
        let kind = kind_of::<K>();
        let key = ObjectKey::of(obj);
        self.wait().await;
        self.record(Verb::Update, &kind, &key);

        if self.take_conflict(&kind) {
            return Err(conflict_error(&kind, &key.name));
        }

        let mut objects = self.objects.lock().unwrap();
        let Some(current) = objects.get(&(kind.clone(), key.clone())) else {
            return Err(not_found_error(&kind, &key.name));
        };
        let current_version = current.pointer("/metadata/resourceVersion").and_then(|v| v.as_str());
        if obj.resource_version().as_deref() != current_version {
            return Err(conflict_error(&kind, &key.name));
        }

        let mut updated = obj.clone();
        updated.meta_mut().resource_version = Some(self.next_version());
        objects.insert((kind, key), serde_json::to_value(&updated)?);
        Ok(updated)
    }
}
