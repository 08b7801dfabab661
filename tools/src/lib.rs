pub mod cli;
pub mod csr_name_map;
pub mod splat;
