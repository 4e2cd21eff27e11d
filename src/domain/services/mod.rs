mod admission_engine;

pub use admission_engine::AdmissionEngine;
