mod db;
mod scenario;
