/// Core Lima Metropolitana districts, in dashboard display order.
pub const LIMA_CORE: [&str; 12] = [
    "Lima Cercado",
    "Miraflores",
    "San Isidro",
    "La Molina",
    "Comas",
    "San Juan de Lurigancho",
    "San Martín de Porres",
    "Villa El Salvador",
    "Ate",
    "Santiago de Surco",
    "Callao",
    "Los Olivos",
];

/// Core districts followed by the ten central districts added later.
pub const LIMA_EXTENDED: [&str; 22] = [
    "Lima Cercado",
    "Miraflores",
    "San Isidro",
    "La Molina",
    "Comas",
    "San Juan de Lurigancho",
    "San Martín de Porres",
    "Villa El Salvador",
    "Ate",
    "Santiago de Surco",
    "Callao",
    "Los Olivos",
    "Chorrillos",
    "Surquillo",
    "Barranco",
    "Magdalena del Mar",
    "Pueblo Libre",
    "Jesús María",
    "Lince",
    "San Borja",
    "Breña",
    "San Miguel",
];
