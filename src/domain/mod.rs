// Domain layer: the decoded class model and the ports the library loader depends on.

pub mod model;
pub mod ports;
