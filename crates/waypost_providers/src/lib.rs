pub mod crow_flies;
pub mod osrm;
