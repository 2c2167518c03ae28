use std::rc::Rc;

use platform_host::{CatalogTable, HostServices, IdentityService, PrefsStore};

use crate::{AiService, WebAppStateStore, WebPrefsStore};

/// Builds the generation facade that mirrors its configuration into `prefs`.
pub fn generation_service(prefs: Rc<dyn PrefsStore>) -> Rc<AiService> {
    Rc::new(AiService::new().with_prefs(prefs))
}

/// Builds the generation facade and reapplies the provider configuration saved in `prefs`.
///
/// A rejected saved configuration is logged and leaves the facade unconfigured.
pub async fn restored_generation_service(prefs: Rc<dyn PrefsStore>) -> Rc<AiService> {
    let service = generation_service(prefs);
    match service.restore_saved_config().await {
        Ok(Some(config)) => {
            tracing::info!(provider = %config.provider, "restored saved provider configuration");
        }
        Ok(None) => {}
        Err(err) => tracing::warn!(%err, "restore saved provider configuration failed"),
    }
    service
}

/// Wires browser storage and the network generation facade around the given backend clients.
///
/// Identity and catalog tables are remote services owned by the embedding application, so they
/// are passed in rather than constructed here.
pub fn build_host_services(
    identity: Rc<dyn IdentityService>,
    catalog: Rc<dyn CatalogTable>,
) -> HostServices {
    let prefs: Rc<dyn PrefsStore> = Rc::new(WebPrefsStore);
    let generation = generation_service(Rc::clone(&prefs));
    assemble(prefs, generation, identity, catalog)
}

/// Like [`build_host_services`], but the generation facade starts from the provider
/// configuration mirrored under `ai_service_config`.
pub async fn build_restored_host_services(
    identity: Rc<dyn IdentityService>,
    catalog: Rc<dyn CatalogTable>,
) -> HostServices {
    let prefs: Rc<dyn PrefsStore> = Rc::new(WebPrefsStore);
    let generation = restored_generation_service(Rc::clone(&prefs)).await;
    assemble(prefs, generation, identity, catalog)
}

fn assemble(
    prefs: Rc<dyn PrefsStore>,
    generation: Rc<AiService>,
    identity: Rc<dyn IdentityService>,
    catalog: Rc<dyn CatalogTable>,
) -> HostServices {
    HostServices::noop()
        .with_storage(Rc::new(WebAppStateStore), prefs)
        .with_identity(identity)
        .with_catalog(catalog)
        .with_generation(generation)
}
