pub mod command;
pub mod file;
pub mod hits;
pub mod mapstat;
pub mod phenotype;
pub mod plotting;
pub mod species;
pub mod streams;
pub mod tsv;
