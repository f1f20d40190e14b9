use bytes::Bytes;
use caskdb::{db::Engine, option::Options};

fn main() {
  let temp_dir = std::env::temp_dir().join("caskdb-basic-operations-demo");
  let mut opts = Options::default();
  opts.dir_path = temp_dir;
  let engine = Engine::open(opts).expect("failed to open engine");

  engine
    .put(Bytes::from("language"), Bytes::from("rust"))
    .expect("failed to put");
  engine
    .put(Bytes::from("engine"), Bytes::from("caskdb"))
    .expect("failed to put");

  let value = engine.get(Bytes::from("language")).expect("failed to get");
  println!("language = {}", String::from_utf8_lossy(&value));

  let mut keys: Vec<String> = engine
    .list_keys()
    .expect("failed to list keys")
    .into_iter()
    .map(|k| String::from_utf8_lossy(&k).into_owned())
    .collect();
  keys.sort();
  println!("keys = {keys:?}");

  engine.delete(Bytes::from("engine")).expect("failed to delete");
  assert!(engine.get(Bytes::from("engine")).is_err());

  let stat = engine.get_engine_stat().expect("failed to get stat");
  println!("{} keys, {} bytes reclaimable", stat.key_num, stat.reclaim_size);

  engine.close().expect("failed to close engine");
}
