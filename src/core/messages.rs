//! User-facing bot texts.

pub const CHOOSE_FUEL: &str = "Выберите тип топлива для заполнения анализов:";
pub const CHOOSE_FUEL_AGAIN: &str = "Пожалуйста, выберите HFO или MDO:";
pub const CHOOSE_HFO_GRADE: &str = "Выберите тип HFO:";
pub const INVALID_HFO_GRADE: &str = "Нужно выбрать «LSFO RMG-180» или «LSFO RMG-380».";

pub const ASK_NAME: &str = "Введите Название судна:";
pub const ASK_DATE: &str = "Введите дату анализа (пример: 28-May-2025):";
pub const INVALID_DATE: &str = "Неверный формат. Должно быть 28-May-2025.";
pub const ASK_DATE_RECEIVED: &str = "Введите дату получения анализа (пример: 29-May-2025):";
pub const INVALID_DATE_RECEIVED: &str = "Неверный формат. Должно быть 29-May-2025.";
pub const ASK_LOCATION: &str = "Введите LOCATION (место бункеровки):";
pub const ASK_SEAL: &str = "Введите SEAL NUMBER (по пломбе с BDN):";
pub const ASK_NUMBER: &str = "Введите REPORT NUMBER (6 цифр, пример: 280525):";
pub const INVALID_NUMBER: &str = "REPORT NUMBER должен быть ровно из 6 цифр, например 280525.";
pub const ASK_BARGE: &str = "Введите название BARGE:";
pub const ASK_DENS: &str = "Введите DENS (Density) из БДН, погрешность ±несколько единиц:";
pub const ASK_VISC: &str = "Введите VISC (Viscosity) из БДН, погрешность ±несколько единиц:";
pub const ASK_FLASH: &str = "Введите FLASH (Flash point) из БДН, погрешность ±несколько единиц:";
pub const ASK_POUR: &str = "Введите POUR (Pour point) из БДН, погрешность ±несколько единиц:";
pub const INVALID_POUR: &str = "Нужно число, пример: 10.5";
pub const ASK_CARBON: &str = "Введите CARBON из БДН, погрешность ±несколько единиц:";
pub const ASK_SULPH: &str = "Введите SULPH (Sulphur) из БДН, погрешность ±несколько единиц:";

pub const GENERATION_FAILED: &str = "Ошибка при создании документа. Попробуйте позже.";
pub const DELIVERY_FAILED: &str = "Не удалось отправить PDF. Попробуйте позже.";
pub const WHAT_NEXT: &str = "Что дальше?";
pub const PRESS_A_BUTTON: &str = "Пожалуйста, нажмите одну из кнопок:";
pub const CANCELLED: &str = "ОК, отмена. Напишите /start, чтобы начать заново.";
pub const FINISHED: &str = "Работа завершена. Нажмите /start, чтобы начать заново.";
pub const SESSION_EXPIRED: &str =
    "Сессия истекла из-за бездействия. Нажмите /start, чтобы начать заново.";

pub fn generating(family: impl std::fmt::Display) -> String {
    format!("Генерируется документ {} и конвертируется в PDF…", family)
}
