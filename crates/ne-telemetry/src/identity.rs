// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Identity of the network element embedding the SDK.
//!
//! Every outgoing record is tagged with the NE unique id. The identity is read at push time, not
//! captured at construction, so a re-registration that assigns a new id takes effect on the next
//! record without rebuilding the services.

use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub org_uid: String,
    pub ne_uid: String,
}

/// Cloneable handle to the process-wide [`Identity`].
#[derive(Debug, Clone, Default)]
pub struct NeIdentity {
    inner: Arc<RwLock<Identity>>,
}

impl NeIdentity {
    pub fn new(org_uid: &str, ne_uid: &str) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Identity {
                org_uid: org_uid.to_string(),
                ne_uid: ne_uid.to_string(),
            })),
        }
    }

    #[allow(clippy::expect_used)]
    pub fn get(&self) -> Identity {
        self.inner.read().expect("lock poisoned").clone()
    }

    #[allow(clippy::expect_used)]
    pub fn ne_uid(&self) -> String {
        self.inner.read().expect("lock poisoned").ne_uid.clone()
    }

    #[allow(clippy::expect_used)]
    pub fn set(&self, identity: Identity) {
        *self.inner.write().expect("lock poisoned") = identity;
    }
}
