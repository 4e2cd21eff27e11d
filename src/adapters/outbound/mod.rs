mod maxmind_geo_resolver;
mod static_geo_resolver;

pub use maxmind_geo_resolver::MaxMindGeoResolver;
pub use static_geo_resolver::{ResolverEvent, StaticGeoResolver};
