use rhai::{packages::Package, Dynamic, Engine};

use super::api;
use super::runtime::RuntimeHandle;
use rhai_process::{Config, ProcessPackage};

pub(super) fn register_all(engine: &mut Engine, runtime: RuntimeHandle) {
    engine.set_default_tag(Dynamic::from(runtime));
    ProcessPackage::new(Config::default()).register_into_engine(engine);
    api::register(engine);
}
