//! MaxMind GeoIP Resolver
//!
//! Implements GeoResolver using a MaxMind GeoLite2/GeoIP2 Country database.

use crate::domain::errors::GeoError;
use crate::domain::ports::GeoResolver;
use crate::domain::value_objects::CountryCode;
use maxminddb::{MaxMindDBError, Reader};
use parking_lot::RwLock;
use serde::Deserialize;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

/// MaxMind GeoIP resolver.
///
/// Holds the opened database until [`GeoResolver::close`] is called.
/// Each lookup clones the reader handle, so closing never pulls the data
/// out from under a lookup that is already running.
pub struct MaxMindGeoResolver {
    reader: RwLock<Option<Arc<Reader<Vec<u8>>>>>,
}

impl MaxMindGeoResolver {
    /// Open a GeoIP database from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let reader = Reader::open_readfile(path)
            .map_err(|e| anyhow::anyhow!("failed to open GeoIP database {}: {}", path.display(), e))?;
        tracing::info!(
            "GeoIP database loaded from {} (type={}, build_epoch={})",
            path.display(),
            reader.metadata.database_type,
            reader.metadata.build_epoch
        );
        Ok(Self::from_reader(reader))
    }

    /// Open a GeoIP database from raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> anyhow::Result<Self> {
        let reader = Reader::from_source(bytes)?;
        Ok(Self::from_reader(reader))
    }

    fn from_reader(reader: Reader<Vec<u8>>) -> Self {
        Self {
            reader: RwLock::new(Some(Arc::new(reader))),
        }
    }

    /// Whether the database handle has been released.
    pub fn is_closed(&self) -> bool {
        self.reader.read().is_none()
    }

    fn handle(&self) -> Result<Arc<Reader<Vec<u8>>>, GeoError> {
        self.reader.read().clone().ok_or(GeoError::Closed)
    }
}

impl GeoResolver for MaxMindGeoResolver {
    fn resolve_country(&self, ip: &str) -> Result<CountryCode, GeoError> {
        #[derive(Debug, Deserialize)]
        struct Country {
            iso_code: Option<String>,
        }

        #[derive(Debug, Deserialize)]
        struct CountryResp {
            country: Option<Country>,
        }

        let addr: IpAddr = ip
            .parse()
            .map_err(|_| GeoError::InvalidAddress(ip.to_string()))?;

        let reader = self.handle()?;
        let resp: CountryResp = reader
            .lookup(addr)
            .map_err(|e| lookup_error(addr, e))?;

        resp.country
            .and_then(|c| c.iso_code)
            .filter(|iso| !iso.is_empty())
            .map(CountryCode::new)
            .ok_or(GeoError::NotFound(addr))
    }

    fn close(&self) -> Result<(), GeoError> {
        match self.reader.write().take() {
            Some(_) => {
                tracing::info!("GeoIP database closed");
                Ok(())
            }
            None => Err(GeoError::Closed),
        }
    }
}

fn lookup_error(addr: IpAddr, err: MaxMindDBError) -> GeoError {
    match err {
        MaxMindDBError::AddressNotFoundError(_) => GeoError::NotFound(addr),
        other => GeoError::LookupFailed(other.to_string()),
    }
}
