pub mod bouquet_repository;
pub mod bouquet_type_repository;
pub mod customer_repository;
pub mod flower_type_repository;
pub mod order_repository;

pub use bouquet_repository::{BouquetChanges, BouquetFilter, BouquetRepository, NewBouquet};
pub use bouquet_type_repository::BouquetTypeRepository;
pub use customer_repository::{CustomerRepository, CustomerRow};
pub use flower_type_repository::{FlowerTypeRepository, FlowerTypeRow};
pub use order_repository::{NewOrder, OrderRepository, StatusTransition};
