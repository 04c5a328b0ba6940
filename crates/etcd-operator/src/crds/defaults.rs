//! Default functions for serde defaults in CRD specs.

pub fn replicas() -> i32 {
    crate::constants::defaults::REPLICAS
}

pub fn storage_size() -> String {
    crate::constants::defaults::STORAGE_SIZE.to_string()
}

pub fn access_modes() -> Vec<String> {
    vec![crate::constants::defaults::ACCESS_MODE.to_string()]
}
