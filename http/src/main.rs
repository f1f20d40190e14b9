use actix_web::{delete, get, post, rt::signal, web, App, HttpResponse, HttpServer, Responder, Scope};
use caskdb::{db::Engine, errors::Errors, option::Options};
use std::{collections::HashMap, path::PathBuf, sync::Arc};

#[post("/put")]
pub async fn put_handler(
  eng: web::Data<Arc<Engine>>,
  data: web::Json<HashMap<String, String>>,
) -> impl Responder {
  for (key, val) in data.iter() {
    if eng
      .put(web::Bytes::from(key.clone()), web::Bytes::from(val.clone()))
      .is_err()
    {
      return HttpResponse::InternalServerError().body("failed to put value into engine");
    }
  }
  HttpResponse::Ok().body("ok")
}

#[get("/get/{key}")]
pub async fn get_handler(eng: web::Data<Arc<Engine>>, key: web::Path<String>) -> impl Responder {
  match eng.get(web::Bytes::from(key.to_string())) {
    Ok(val) => HttpResponse::Ok().body(val),
    Err(e) => match e {
      Errors::KeyNotFound => HttpResponse::Ok().body("key not found"),
      _ => HttpResponse::InternalServerError().body("failed to get value from engine"),
    },
  }
}

#[delete("/delete/{key}")]
pub async fn delete_handler(eng: web::Data<Arc<Engine>>, key: web::Path<String>) -> impl Responder {
  if let Err(e) = eng.delete(web::Bytes::from(key.to_string())) {
    match e {
      Errors::KeyNotFound => return HttpResponse::Ok().body("key not found"),
      _ => return HttpResponse::InternalServerError().body("failed to delete value in engine"),
    }
  }
  HttpResponse::Ok().body("ok")
}

#[get("/listkeys")]
pub async fn listkeys_handler(eng: web::Data<Arc<Engine>>) -> impl Responder {
  let keys = match eng.list_keys() {
    Ok(keys) => keys,
    Err(_) => return HttpResponse::InternalServerError().body("failed to list keys"),
  };

  let keys = keys
    .into_iter()
    .map(|key| String::from_utf8_lossy(&key).into_owned())
    .collect::<Vec<String>>();
  let res = serde_json::to_string(&keys).unwrap();
  HttpResponse::Ok()
    .content_type("application/json")
    .body(res)
}

#[get("/stat")]
pub async fn stat_handler(eng: web::Data<Arc<Engine>>) -> impl Responder {
  let stat = match eng.get_engine_stat() {
    Ok(stat) => stat,
    Err(_) => return HttpResponse::InternalServerError().body("failed to get stat in engine"),
  };

  let mut res = HashMap::new();
  res.insert("key_num", stat.key_num);
  res.insert("data_file_num", stat.data_file_num);
  res.insert("reclaim_size", stat.reclaim_size);
  res.insert("invalid_pieces", stat.invalid_pieces);
  res.insert("disk_size", stat.disk_size as usize);

  HttpResponse::Ok()
    .content_type("application/json")
    .body(serde_json::to_string(&res).unwrap())
}

async fn run_server(engine: Arc<Engine>) -> std::io::Result<()> {
  let server = HttpServer::new(move || {
    App::new().app_data(web::Data::new(engine.clone())).service(
      Scope::new("/caskdb")
        .service(put_handler)
        .service(get_handler)
        .service(delete_handler)
        .service(listkeys_handler)
        .service(stat_handler),
    )
  })
  .bind("127.0.0.1:8080")
  .unwrap()
  .run();

  server.await
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
  let engine = Arc::new(
    Engine::open(Options {
      dir_path: PathBuf::from("/tmp/caskdb-http"),
      ..Default::default()
    })
    .unwrap(),
  );

  let server_handle = tokio::spawn({
    let engine = engine.clone();
    async move { run_server(engine).await }
  });

  signal::ctrl_c().await?;
  println!("received shutdown signal, closing engine ...");

  server_handle.abort();

  if let Err(e) = engine.close() {
    eprintln!("failed to close engine: {e}");
  }

  println!("engine is closed");

  Ok(())
}
