pub mod isolate;
