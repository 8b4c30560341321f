//! In-memory vendor clients for tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use lyra_core::provider::{BoxFuture, RemoteError, RemoteResult};

use crate::resources::principal_tag::PrincipalTagMap;
use crate::resources::{CognitoIdentityApi, IotApi};

/// Cognito Identity fake: one tag map per linked (pool, provider)
#[derive(Default)]
pub struct FakeCognito {
    maps: Mutex<HashMap<(String, String), PrincipalTagMap>>,
    sent: Mutex<Vec<PrincipalTagMap>>,
    calls: AtomicUsize,
}

impl FakeCognito {
    pub fn link_provider(&self, pool: &str, provider: &str) {
        self.maps.lock().unwrap().insert(
            (pool.to_string(), provider.to_string()),
            PrincipalTagMap {
                identity_pool_id: pool.to_string(),
                identity_provider_name: provider.to_string(),
                principal_tags: None,
                use_defaults: Some(true),
            },
        );
    }

    /// Requests accepted by the set call, in order
    pub fn sent(&self) -> Vec<PrincipalTagMap> {
        self.sent.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CognitoIdentityApi for FakeCognito {
    fn set_principal_tag_attribute_map(
        &self,
        input: PrincipalTagMap,
    ) -> BoxFuture<'_, RemoteResult<()>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let key = (input.identity_pool_id.clone(), input.identity_provider_name.clone());
            let mut maps = self.maps.lock().unwrap();
            let Some(stored) = maps.get_mut(&key) else {
                return Err(RemoteError::not_found(format!(
                    "IdentityPool '{}' not found",
                    input.identity_pool_id
                )));
            };
            *stored = input.clone();
            self.sent.lock().unwrap().push(input);
            Ok(())
        })
    }

    fn get_principal_tag_attribute_map(
        &self,
        identity_pool_id: &str,
        identity_provider_name: &str,
    ) -> BoxFuture<'_, RemoteResult<PrincipalTagMap>> {
        let key = (identity_pool_id.to_string(), identity_provider_name.to_string());
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.maps
                .lock()
                .unwrap()
                .get(&key)
                .cloned()
                .ok_or_else(|| RemoteError::not_found(format!("IdentityPool '{}' not found", key.0)))
        })
    }
}

/// IoT fake: principals attached per existing thing
#[derive(Default)]
pub struct FakeIot {
    things: Mutex<HashMap<String, HashSet<String>>>,
    calls: AtomicUsize,
}

impl FakeIot {
    pub fn create_thing(&self, thing: &str) {
        self.things
            .lock()
            .unwrap()
            .insert(thing.to_string(), HashSet::new());
    }

    pub fn detach_out_of_band(&self, thing: &str, principal: &str) {
        if let Some(principals) = self.things.lock().unwrap().get_mut(thing) {
            principals.remove(principal);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn with_thing<T>(
        &self,
        thing: &str,
        f: impl FnOnce(&mut HashSet<String>) -> RemoteResult<T>,
    ) -> RemoteResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut things = self.things.lock().unwrap();
        match things.get_mut(thing) {
            Some(principals) => f(principals),
            None => Err(RemoteError::not_found(format!("Thing {} not found", thing))),
        }
    }
}

impl IotApi for FakeIot {
    fn attach_thing_principal(&self, thing: &str, principal: &str) -> BoxFuture<'_, RemoteResult<()>> {
        let (thing, principal) = (thing.to_string(), principal.to_string());
        Box::pin(async move {
            self.with_thing(&thing, |principals| {
                principals.insert(principal);
                Ok(())
            })
        })
    }

    fn list_thing_principals(&self, thing: &str) -> BoxFuture<'_, RemoteResult<Vec<String>>> {
        let thing = thing.to_string();
        Box::pin(async move {
            self.with_thing(&thing, |principals| {
                let mut list: Vec<String> = principals.iter().cloned().collect();
                list.sort();
                Ok(list)
            })
        })
    }

    fn detach_thing_principal(&self, thing: &str, principal: &str) -> BoxFuture<'_, RemoteResult<()>> {
        let (thing, principal) = (thing.to_string(), principal.to_string());
        Box::pin(async move {
            self.with_thing(&thing, |principals| {
                if principals.remove(&principal) {
                    Ok(())
                } else {
                    Err(RemoteError::not_found("principal is not attached"))
                }
            })
        })
    }
}
