#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod calico;
pub mod custom_deny;

pub use self::{
    calico::{NetworkPolicy, NetworkPolicySpec},
    custom_deny::{CustomDeny, CustomDenySpec},
};
pub use deny_controller_core::selector::Map as Labels;
pub use k8s_openapi::api::{self, apps::v1::Deployment};
pub use kube::{
    api::{
        Api, ApiResource, DeleteParams, DynamicObject, ListParams, ObjectMeta, Patch, PatchParams,
        PostParams, ResourceExt, WatchEvent, WatchParams,
    },
    Client, Error, Resource,
};
